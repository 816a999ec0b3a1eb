//! Lossless stream muxing
//!
//! The [`Muxer`] trait combines one video-only file and one audio-only file
//! into a single container by stream copy.
//!
//! - [`FfmpegMuxer`]: drives the external `ffmpeg` binary
//! - [`NoOpMuxer`]: stub used when ffmpeg is unavailable

mod cli;
mod noop;
mod traits;

pub use cli::{FfmpegMuxer, ffmpeg_args};
pub use noop::NoOpMuxer;
pub use traits::{MuxOutput, Muxer};
