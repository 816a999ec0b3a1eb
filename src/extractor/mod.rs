//! Media extraction backends
//!
//! The pipeline talks to the extraction/download library through the
//! [`MediaExtractor`] trait: one call to probe a source's metadata and one
//! call to download a single elementary stream to an exact path.
//!
//! ## Implementations
//!
//! - [`CliExtractor`]: drives the external `yt-dlp` binary
//! - [`NoOpExtractor`]: stub used when yt-dlp is unavailable
//!
//! ## Usage
//!
//! ```no_run
//! use media_merge_dl::extractor::{CliExtractor, MediaExtractor};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let extractor = CliExtractor::from_path()
//!         .expect("yt-dlp binary not found");
//!
//!     let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
//!     let metadata = extractor.probe_metadata(url).await?;
//!     println!("Downloading video stream of {}", metadata.title);
//!
//!     extractor
//!         .fetch_stream(url, "bestvideo", Path::new("video.mp4"))
//!         .await?;
//!     Ok(())
//! }
//! ```

mod cli;
mod noop;
mod parser;
mod traits;

pub use cli::CliExtractor;
pub use noop::NoOpExtractor;
pub use parser::parse_probe_output;
pub use traits::MediaExtractor;
