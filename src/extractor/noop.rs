//! No-op extractor for graceful degradation

use super::traits::MediaExtractor;
use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::path::Path;

/// No-op extractor used when yt-dlp is unavailable
///
/// Every operation returns `Error::NotSupported`, so a pipeline built without
/// yt-dlp still constructs and reports a clear failure per run.
///
/// # Examples
///
/// ```
/// use media_merge_dl::extractor::{MediaExtractor, NoOpExtractor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let extractor = NoOpExtractor;
/// let err = extractor.probe_metadata("https://example.com/v").await.unwrap_err();
/// assert_eq!(err.code(), "not_supported");
/// # }
/// ```
pub struct NoOpExtractor;

const MISSING_YTDLP: &str = "media extraction requires the yt-dlp binary. \
     Configure ytdlp_path in config or ensure yt-dlp is in PATH.";

#[async_trait]
impl MediaExtractor for NoOpExtractor {
    async fn probe_metadata(&self, _url: &str) -> crate::Result<MediaMetadata> {
        Err(crate::Error::NotSupported(MISSING_YTDLP.into()))
    }

    async fn fetch_stream(
        &self,
        _url: &str,
        _format: &str,
        _destination: &Path,
    ) -> crate::Result<()> {
        Err(crate::Error::NotSupported(MISSING_YTDLP.into()))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
