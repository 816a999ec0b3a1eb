//! Error types for media-merge-dl
//!
//! This module provides the error taxonomy of the fetch-and-merge pipeline:
//! - Fatal pre-session errors (metadata probe, output directory creation)
//! - Per-stream fetch errors, aggregated once both fetches are known
//! - Merge tool errors (non-zero exit, missing output, timeout)
//! - Non-fatal cleanup warnings that never override the pipeline result
//!
//! Every [`Error`] maps to a machine-readable code via [`Error::code`] so callers
//! can branch on the failing stage without parsing messages.

use crate::types::{Stage, StreamKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for media-merge-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-merge-dl
///
/// Each variant identifies the pipeline stage that failed, so the rendered
/// message doubles as the single failure reason reported on a
/// [`MergeOutcome`](crate::types::MergeOutcome).
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_workers")
        key: Option<String>,
    },

    /// The source could not be probed for metadata
    #[error("metadata probe failed: {0}")]
    MetadataProbe(#[from] ProbeError),

    /// The output directory could not be created
    #[error("failed to create output directory {}: {source}", path.display())]
    DirectoryCreation {
        /// The directory that could not be created
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// One or both stream fetches failed
    #[error("stream fetch failed: {}", describe_fetch_failures(.0))]
    StreamFetch(Vec<FetchError>),

    /// Merging the fetched streams failed
    #[error("merge failed: {0}")]
    Merge(#[from] MergeError),

    /// The run was cancelled by the caller
    #[error("cancelled during {stage}")]
    Cancelled {
        /// The stage that was running when cancellation was observed
        stage: Stage,
    },

    /// External tool execution failed (yt-dlp, ffmpeg)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Metadata probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The source could not be reached or the extractor failed
    #[error("{url} is unreachable: {reason}")]
    Unreachable {
        /// The source URL
        url: String,
        /// Why the source could not be reached
        reason: String,
    },

    /// No extractor supports the source
    #[error("{url} is not supported: {reason}")]
    Unsupported {
        /// The source URL
        url: String,
        /// Why the source is not supported
        reason: String,
    },

    /// The extractor itself could not run (missing or unexecutable binary)
    #[error("extractor unavailable for {url}: {reason}")]
    ExtractorUnavailable {
        /// The source URL
        url: String,
        /// Why the extractor could not run
        reason: String,
    },

    /// The extractor returned metadata that could not be understood
    #[error("invalid metadata response: {0}")]
    InvalidResponse(String),

    /// The probe did not finish in time
    #[error("probe timed out after {}s", .after.as_secs())]
    Timeout {
        /// The configured probe timeout
        after: Duration,
    },
}

/// Failure of a single stream fetch
///
/// Fetch errors are captured as values on a
/// [`StreamFetchResult`](crate::types::StreamFetchResult) and never returned
/// to the orchestrator as `Err`.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// The external download operation reported an error
    #[error("{stream} stream: {message}")]
    Tool {
        /// Which stream failed
        stream: StreamKind,
        /// Error detail from the extractor
        message: String,
    },

    /// The download returned but left no usable file behind
    #[error("{stream} stream: no data written to {}", path.display())]
    EmptyOutput {
        /// Which stream failed
        stream: StreamKind,
        /// The destination that is missing or empty
        path: PathBuf,
    },

    /// The download did not finish in time
    #[error("{stream} stream: timed out after {}s", .after.as_secs())]
    Timeout {
        /// Which stream failed
        stream: StreamKind,
        /// The configured fetch timeout
        after: Duration,
    },

    /// The fetch task ended without producing a result
    #[error("{stream} stream: fetch task aborted: {message}")]
    Aborted {
        /// Which stream failed
        stream: StreamKind,
        /// Join error detail
        message: String,
    },
}

impl FetchError {
    /// The stream this error belongs to
    pub fn stream(&self) -> StreamKind {
        match self {
            FetchError::Tool { stream, .. }
            | FetchError::EmptyOutput { stream, .. }
            | FetchError::Timeout { stream, .. }
            | FetchError::Aborted { stream, .. } => *stream,
        }
    }
}

/// Merge (remux) errors
#[derive(Debug, Error)]
pub enum MergeError {
    /// A merge input was missing when the merge stage started
    #[error("input file missing: {}", path.display())]
    MissingInput {
        /// The missing input
        path: PathBuf,
    },

    /// The merge tool exited with a non-zero status
    #[error("merge tool exited with {}: {stderr}", describe_status(.status))]
    ToolFailed {
        /// Exit code, if the process exited normally
        status: Option<i32>,
        /// Captured error output of the tool
        stderr: String,
    },

    /// The merge tool reported success but produced no output
    #[error("merge tool exited successfully but wrote no output to {}", path.display())]
    MissingOutput {
        /// The path the tool was asked to write
        path: PathBuf,
    },

    /// The merge did not finish in time
    #[error("merge timed out after {}s", .after.as_secs())]
    Timeout {
        /// The configured merge timeout
        after: Duration,
    },

    /// The merged file could not be moved to its final location
    #[error("failed to move {} to {}: {reason}", staging.display(), destination.display())]
    Finalize {
        /// The staging file written by the merge tool
        staging: PathBuf,
        /// The final output path
        destination: PathBuf,
        /// The reason the move failed
        reason: String,
    },
}

/// Non-fatal failure to remove a temp file during cleanup
///
/// Cleanup warnings are logged and reported alongside the pipeline outcome,
/// but never change whether the run succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupWarning {
    /// The file that could not be removed
    pub path: PathBuf,
    /// Why the removal failed
    pub reason: String,
}

impl std::fmt::Display for CleanupWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "failed to remove {}: {}", self.path.display(), self.reason)
    }
}

impl Error {
    /// Machine-readable error code
    ///
    /// Each merge failure mode has its own code: a missing input
    /// (`merge_missing_input`), a non-zero exit (`merge_tool_failed`), a zero
    /// exit without output (`merge_output_missing`) and a failed move onto the
    /// final path (`merge_finalize_failed`).
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::MetadataProbe(ProbeError::Unsupported { .. }) => "source_unsupported",
            Error::MetadataProbe(_) => "metadata_probe_failed",
            Error::DirectoryCreation { .. } => "directory_creation_failed",
            Error::StreamFetch(_) => "stream_fetch_failed",
            Error::Merge(MergeError::MissingInput { .. }) => "merge_missing_input",
            Error::Merge(MergeError::ToolFailed { .. }) => "merge_tool_failed",
            Error::Merge(MergeError::MissingOutput { .. }) => "merge_output_missing",
            Error::Merge(MergeError::Timeout { .. }) => "merge_timeout",
            Error::Merge(MergeError::Finalize { .. }) => "merge_finalize_failed",
            Error::Cancelled { .. } => "cancelled",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
        }
    }

    /// The streams whose fetch failed, if this is a fetch error
    pub fn failed_streams(&self) -> Vec<StreamKind> {
        match self {
            Error::StreamFetch(failures) => failures.iter().map(FetchError::stream).collect(),
            _ => Vec::new(),
        }
    }
}

fn describe_fetch_failures(failures: &[FetchError]) -> String {
    if failures.is_empty() {
        return "no stream reported an error".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

fn describe_status(status: &Option<i32>) -> String {
    match status {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}
