//! Parser for yt-dlp command output

use crate::error::ProbeError;
use crate::types::MediaMetadata;
use crate::utils::summarize_stderr;
use serde::Deserialize;
use std::str;

/// Subset of the `--dump-single-json` document the pipeline needs
#[derive(Debug, Deserialize)]
struct ProbeResponse {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "_type")]
    kind: Option<String>,
}

/// Parse output from `yt-dlp --dump-single-json`
///
/// # Arguments
///
/// * `url` - The probed URL, for error messages
/// * `stdout` - Standard output from yt-dlp
/// * `stderr` - Standard error from yt-dlp
/// * `success` - Whether yt-dlp exited successfully
///
/// # Errors
///
/// - [`ProbeError::Unsupported`] when yt-dlp has no extractor for the URL or
///   the URL resolves to a playlist
/// - [`ProbeError::Unreachable`] for any other non-zero exit
/// - [`ProbeError::InvalidResponse`] when stdout is not the expected JSON
pub fn parse_probe_output(
    url: &str,
    stdout: &[u8],
    stderr: &[u8],
    success: bool,
) -> Result<MediaMetadata, ProbeError> {
    if !success {
        let error_output = summarize_stderr(stderr);
        let reason = if error_output.is_empty() {
            "yt-dlp exited with an error".to_string()
        } else {
            error_output
        };

        return Err(if is_unsupported(&reason) {
            ProbeError::Unsupported {
                url: url.to_string(),
                reason,
            }
        } else {
            ProbeError::Unreachable {
                url: url.to_string(),
                reason,
            }
        });
    }

    let output = str::from_utf8(stdout)
        .map_err(|e| ProbeError::InvalidResponse(format!("output is not UTF-8: {}", e)))?;
    let response: ProbeResponse = serde_json::from_str(output.trim())
        .map_err(|e| ProbeError::InvalidResponse(e.to_string()))?;

    if response.kind.as_deref() == Some("playlist") {
        return Err(ProbeError::Unsupported {
            url: url.to_string(),
            reason: "URL resolves to a playlist".to_string(),
        });
    }

    let title = response
        .title
        .filter(|t| !t.trim().is_empty())
        .or_else(|| response.id.clone())
        .ok_or_else(|| ProbeError::InvalidResponse("response has neither title nor id".into()))?;

    Ok(MediaMetadata {
        title,
        id: response.id,
    })
}

fn is_unsupported(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    lower.contains("unsupported url") || lower.contains("no suitable extractor")
}
