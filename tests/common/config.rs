//! Test configuration helpers

use media_merge_dl::{Config, MediaExtractor, MediaPipeline, Muxer};
use std::sync::Arc;

/// Config whose default selectors match the fake extractor's working formats
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.formats.video_format = "bestvideo".to_string();
    config.formats.audio_format = "bestaudio".to_string();
    config
}

/// Pipeline over the given doubles with [`test_config`]
pub fn pipeline_with(
    extractor: Arc<dyn MediaExtractor>,
    muxer: Arc<dyn Muxer>,
) -> MediaPipeline {
    MediaPipeline::with_backends(test_config(), extractor, muxer).unwrap()
}

/// URL used by live tests
///
/// Read from `LIVE_MEDIA_URL` (a `.env` file is honored); defaults to the
/// first video ever uploaded to YouTube, which is short and stable.
pub fn live_media_url() -> String {
    dotenvy::dotenv().ok();
    std::env::var("LIVE_MEDIA_URL")
        .unwrap_or_else(|_| "https://www.youtube.com/watch?v=jNQXAC9IVRw".to_string())
}

/// Whether both external tools are installed
pub fn has_live_tools() -> bool {
    which::which("yt-dlp").is_ok() && which::which("ffmpeg").is_ok()
}
