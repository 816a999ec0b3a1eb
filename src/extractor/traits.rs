//! Trait for the media extraction backend

use crate::types::MediaMetadata;
use async_trait::async_trait;
use std::path::Path;

/// Trait for media extraction
///
/// This trait is the pipeline's view of the extraction/download library:
/// probing a source for its title and downloading exactly one elementary
/// stream to a given path. Implementations can drive an external binary,
/// call a library, or provide stub functionality for graceful degradation.
///
/// Implementations must stop any work they started when the returned future
/// is dropped; the pipeline drops in-flight calls on cancellation and timeout.
///
/// # Examples
///
/// ```no_run
/// use media_merge_dl::extractor::{CliExtractor, MediaExtractor};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = CliExtractor::from_path()
///     .expect("yt-dlp binary not found");
///
/// let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";
/// let metadata = extractor.probe_metadata(url).await?;
/// println!("Title: {}", metadata.title);
///
/// extractor
///     .fetch_stream(url, "bestaudio[ext=m4a]", Path::new("audio.m4a"))
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait MediaExtractor: Send + Sync {
    /// Probe a source for metadata without downloading media
    ///
    /// # Errors
    ///
    /// Returns [`Error::MetadataProbe`](crate::Error::MetadataProbe) if the
    /// source is unreachable or unsupported, or
    /// [`Error::NotSupported`](crate::Error::NotSupported) for stub
    /// implementations.
    async fn probe_metadata(&self, url: &str) -> crate::Result<MediaMetadata>;

    /// Download one elementary stream selected by `format` to `destination`
    ///
    /// Success only means the backend reported success; the caller checks
    /// that `destination` holds data.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the format cannot be resolved.
    async fn fetch_stream(&self, url: &str, format: &str, destination: &Path)
    -> crate::Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
