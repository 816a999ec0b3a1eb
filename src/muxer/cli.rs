//! ffmpeg-based muxer

use super::traits::{MuxOutput, Muxer};
use crate::utils::summarize_stderr;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

/// Muxer driving the external ffmpeg binary
///
/// Maps the first video stream of the video input and the first audio stream
/// of the audio input into the output with `-c copy`, so no stream is
/// re-encoded.
///
/// # Examples
///
/// ```no_run
/// use media_merge_dl::muxer::{FfmpegMuxer, Muxer};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let muxer = FfmpegMuxer::from_path().expect("ffmpeg not found in PATH");
/// let result = muxer
///     .merge_streams(
///         Path::new("video.mp4"),
///         Path::new("audio.m4a"),
///         Path::new("merged.mp4"),
///     )
///     .await?;
/// assert!(result.success);
/// # Ok(())
/// # }
/// ```
pub struct FfmpegMuxer {
    binary_path: PathBuf,
}

impl FfmpegMuxer {
    /// Create a new muxer with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find ffmpeg in PATH
    ///
    /// # Returns
    ///
    /// `Some(FfmpegMuxer)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("ffmpeg").ok().map(Self::new)
    }

    /// Path of the binary this muxer runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }
}

/// Build the ffmpeg argument list for a stream-copy merge
pub fn ffmpeg_args(video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error", "-y", "-i"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(video.into());
    args.push("-i".into());
    args.push(audio.into());
    args.extend(
        [
            "-map",
            "0:v:0",
            "-map",
            "1:a:0",
            "-c:v",
            "copy",
            "-c:a",
            "copy",
            "-movflags",
            "+faststart",
        ]
        .iter()
        .map(OsString::from),
    );
    args.push(output.into());
    args
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn merge_streams(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> crate::Result<MuxOutput> {
        let result = Command::new(&self.binary_path)
            .args(ffmpeg_args(video, audio, output))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| crate::Error::ExternalTool(format!("Failed to execute ffmpeg: {}", e)))?;

        Ok(MuxOutput {
            success: result.status.success(),
            status: result.status.code(),
            stderr: summarize_stderr(&result.stderr),
        })
    }

    fn name(&self) -> &'static str {
        "ffmpeg"
    }
}
