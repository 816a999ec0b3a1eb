//! No-op muxer for graceful degradation

use super::traits::{MuxOutput, Muxer};
use async_trait::async_trait;
use std::path::Path;

/// No-op muxer used when ffmpeg is unavailable
///
/// Returns `Error::NotSupported` for every merge.
pub struct NoOpMuxer;

#[async_trait]
impl Muxer for NoOpMuxer {
    async fn merge_streams(
        &self,
        _video: &Path,
        _audio: &Path,
        _output: &Path,
    ) -> crate::Result<MuxOutput> {
        Err(crate::Error::NotSupported(
            "merging streams requires the ffmpeg binary. \
             Configure ffmpeg_path in config or ensure ffmpeg is in PATH."
                .into(),
        ))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
