//! CLI-based extractor using the external yt-dlp binary

use super::parser::parse_probe_output;
use super::traits::MediaExtractor;
use crate::error::{Error, ProbeError};
use crate::types::MediaMetadata;
use crate::utils::summarize_stderr;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use url::Url;

/// CLI-based extractor using the external yt-dlp binary
///
/// Every call spawns one yt-dlp process. The process is killed if the
/// returned future is dropped, so timeouts and cancellation never leave a
/// download running in the background.
///
/// # Examples
///
/// ```no_run
/// use media_merge_dl::extractor::{CliExtractor, MediaExtractor};
/// use std::path::PathBuf;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// // Create with explicit path
/// let extractor = CliExtractor::new(PathBuf::from("/usr/local/bin/yt-dlp"));
///
/// // Or auto-discover from PATH
/// let extractor = CliExtractor::from_path()
///     .expect("yt-dlp not found in PATH");
///
/// let metadata = extractor
///     .probe_metadata("https://www.youtube.com/watch?v=dQw4w9WgXcQ")
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct CliExtractor {
    binary_path: PathBuf,
}

impl CliExtractor {
    /// Create a new CLI extractor with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    ///
    /// # Returns
    ///
    /// `Some(CliExtractor)` if the binary is found, `None` otherwise.
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Path of the binary this extractor runs
    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.stdin(Stdio::null()).kill_on_drop(true);
        cmd
    }
}

/// Reject anything yt-dlp would treat as a local path or a non-web scheme
fn validate_source_url(url: &str) -> Result<(), ProbeError> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::Unsupported {
        url: url.to_string(),
        reason: format!("invalid URL: {}", e),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(ProbeError::Unsupported {
            url: url.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}

/// Arguments for a metadata-only probe
pub(crate) fn probe_args(url: &str) -> Vec<String> {
    [
        "--dump-single-json",
        "--skip-download",
        "--no-playlist",
        "--no-warnings",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(url.to_string()))
    .collect()
}

/// Arguments for downloading one stream to an exact destination
///
/// `-o` takes an output template, so `%` in the destination is escaped to
/// keep yt-dlp from expanding it.
pub(crate) fn fetch_args(url: &str, format: &str, destination: &Path) -> Vec<String> {
    vec![
        "--no-playlist".to_string(),
        "--no-warnings".to_string(),
        "--quiet".to_string(),
        "--no-progress".to_string(),
        "-f".to_string(),
        format.to_string(),
        "-o".to_string(),
        destination.to_string_lossy().replace('%', "%%"),
        url.to_string(),
    ]
}

#[async_trait]
impl MediaExtractor for CliExtractor {
    async fn probe_metadata(&self, url: &str) -> crate::Result<MediaMetadata> {
        validate_source_url(url)?;

        let output = self
            .command()
            .args(probe_args(url))
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        Ok(parse_probe_output(
            url,
            &output.stdout,
            &output.stderr,
            output.status.success(),
        )?)
    }

    async fn fetch_stream(
        &self,
        url: &str,
        format: &str,
        destination: &Path,
    ) -> crate::Result<()> {
        validate_source_url(url)?;

        let output = self
            .command()
            .args(fetch_args(url, format, destination))
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = summarize_stderr(&output.stderr);
        Err(Error::ExternalTool(if stderr.is_empty() {
            format!("yt-dlp exited with status {}", output.status)
        } else {
            stderr
        }))
    }

    fn name(&self) -> &'static str {
        "cli-yt-dlp"
    }
}
