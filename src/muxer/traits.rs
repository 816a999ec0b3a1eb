//! Trait for the stream muxing backend

use async_trait::async_trait;
use std::path::Path;

/// Result of one merge tool invocation
///
/// A tool that ran to completion is reported here whether it succeeded or
/// not; only failing to run the tool at all is an `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxOutput {
    /// Whether the tool exited with status zero
    pub success: bool,
    /// Exit code, if the process exited normally
    pub status: Option<i32>,
    /// Condensed error output of the tool
    pub stderr: String,
}

impl MuxOutput {
    /// A successful run with no error output
    pub fn succeeded() -> Self {
        Self {
            success: true,
            status: Some(0),
            stderr: String::new(),
        }
    }
}

/// Trait for combining one video file and one audio file into a container
///
/// Implementations must copy both streams without re-encoding, and must stop
/// the underlying process when the returned future is dropped.
#[async_trait]
pub trait Muxer: Send + Sync {
    /// Merge the video stream of `video` with the audio stream of `audio`
    /// into `output`, overwriting `output` if it exists
    ///
    /// # Errors
    ///
    /// Returns an error only if the tool could not be run.
    async fn merge_streams(
        &self,
        video: &Path,
        audio: &Path,
        output: &Path,
    ) -> crate::Result<MuxOutput>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
