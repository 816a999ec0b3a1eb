//! Core types for media-merge-dl

use crate::config::Config;
use crate::error::{CleanupWarning, Error, FetchError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Per-run identifier used to namespace temporary files
///
/// Rendered as 12 lowercase hex characters (48 random bits).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub u64);

impl SessionId {
    /// Number of random bits carried by a session token
    pub const BITS: u32 = 48;

    /// Generate a fresh random session id
    pub fn generate() -> Self {
        use rand::Rng;
        let mask = (1u64 << Self::BITS) - 1;
        Self(rand::thread_rng().r#gen::<u64>() & mask)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:012x}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(u64::from_str_radix(s, 16)?))
    }
}

/// One elementary stream of a media item
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    /// Video-only stream
    Video,
    /// Audio-only stream
    Audio,
}

impl StreamKind {
    /// Filename prefix used for this stream's temp file
    pub fn temp_prefix(&self) -> &'static str {
        match self {
            StreamKind::Video => "video_",
            StreamKind::Audio => "audio_",
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Video => f.write_str("video"),
            StreamKind::Audio => f.write_str("audio"),
        }
    }
}

/// Pipeline stage
///
/// A run moves through
/// `ProbingMetadata -> AllocatingSession -> FetchingStreams ->
/// {MergingStreams | SkippingMerge} -> CleaningUp -> {Succeeded | Failed}`.
/// A failed probe or session allocation goes straight to `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Probing the source for metadata
    ProbingMetadata,
    /// Creating the output directory and temp file namespace
    AllocatingSession,
    /// Fetching video and audio in parallel
    FetchingStreams,
    /// Remuxing the fetched streams
    MergingStreams,
    /// A fetch failed, so the merge is skipped
    SkippingMerge,
    /// Removing temp files
    CleaningUp,
    /// Terminal: merged output is in place
    Succeeded,
    /// Terminal: the run failed
    Failed,
}

impl Stage {
    /// Whether this is a terminal stage (`Succeeded` or `Failed`)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Succeeded | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::ProbingMetadata => "probing metadata",
            Stage::AllocatingSession => "allocating session",
            Stage::FetchingStreams => "fetching streams",
            Stage::MergingStreams => "merging streams",
            Stage::SkippingMerge => "skipping merge",
            Stage::CleaningUp => "cleaning up",
            Stage::Succeeded => "succeeded",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Input to one pipeline run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRequest {
    /// URL of the media item
    pub source_url: String,
    /// Directory receiving temp files and the merged output
    pub output_directory: PathBuf,
    /// Format selector for the video stream (e.g., "bestvideo")
    pub video_format: String,
    /// Format selector for the audio stream (e.g., "bestaudio[ext=m4a]")
    pub audio_format: String,
    /// Output file name overriding the probed title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_filename: Option<String>,
}

impl MediaRequest {
    /// Create a request using the default format selectors from `config`
    pub fn new(
        source_url: impl Into<String>,
        output_directory: impl Into<PathBuf>,
        config: &Config,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            output_directory: output_directory.into(),
            video_format: config.formats.video_format.clone(),
            audio_format: config.formats.audio_format.clone(),
            output_filename: None,
        }
    }

    /// Override the video format selector
    pub fn with_video_format(mut self, format: impl Into<String>) -> Self {
        self.video_format = format.into();
        self
    }

    /// Override the audio format selector
    pub fn with_audio_format(mut self, format: impl Into<String>) -> Self {
        self.audio_format = format.into();
        self
    }

    /// Name the output file instead of deriving it from the title
    pub fn with_output_filename(mut self, name: impl Into<String>) -> Self {
        self.output_filename = Some(name.into());
        self
    }

    /// Format selector for the given stream
    pub fn format_for(&self, stream: StreamKind) -> &str {
        match stream {
            StreamKind::Video => &self.video_format,
            StreamKind::Audio => &self.audio_format,
        }
    }
}

/// Metadata probed from the source
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Human-readable title, used to name the output file
    pub title: String,
    /// Extractor-specific identifier, if reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl MediaMetadata {
    /// Metadata with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: None,
        }
    }
}

/// Result of fetching one stream
///
/// Produced by the stream fetcher and consumed by the orchestrator.
#[must_use]
#[derive(Clone, Debug)]
pub struct StreamFetchResult {
    /// Which stream was fetched
    pub stream: StreamKind,
    /// Path of the fetched file (set only on success)
    pub path: Option<PathBuf>,
    /// Whether the fetch produced a non-empty file
    pub succeeded: bool,
    /// Why the fetch failed
    pub error: Option<FetchError>,
}

impl StreamFetchResult {
    /// A successful fetch into `path`
    pub fn success(stream: StreamKind, path: PathBuf) -> Self {
        Self {
            stream,
            path: Some(path),
            succeeded: true,
            error: None,
        }
    }

    /// A failed fetch
    pub fn failure(error: FetchError) -> Self {
        Self {
            stream: error.stream(),
            path: None,
            succeeded: false,
            error: Some(error),
        }
    }
}

/// Terminal value of a pipeline run
#[must_use]
#[derive(Debug)]
pub struct MergeOutcome {
    /// Whether the merged output is in place
    pub succeeded: bool,
    /// Path of the merged file (set only on success)
    pub output_path: Option<PathBuf>,
    /// Session of the run, if one was allocated
    pub session_id: Option<SessionId>,
    /// Why the run failed
    pub failure: Option<Error>,
    /// Temp files that could not be removed
    pub cleanup_warnings: Vec<CleanupWarning>,
}

impl MergeOutcome {
    /// A successful run
    pub fn success(session_id: SessionId, output_path: PathBuf) -> Self {
        Self {
            succeeded: true,
            output_path: Some(output_path),
            session_id: Some(session_id),
            failure: None,
            cleanup_warnings: Vec::new(),
        }
    }

    /// A failed run
    pub fn failure(session_id: Option<SessionId>, error: Error) -> Self {
        Self {
            succeeded: false,
            output_path: None,
            session_id,
            failure: Some(error),
            cleanup_warnings: Vec::new(),
        }
    }

    /// Attach cleanup warnings
    pub fn with_cleanup_warnings(mut self, warnings: Vec<CleanupWarning>) -> Self {
        self.cleanup_warnings = warnings;
        self
    }

    /// The failure reason, naming the stage that failed
    pub fn reason(&self) -> Option<String> {
        self.failure.as_ref().map(ToString::to_string)
    }

    /// Machine-readable failure code
    pub fn code(&self) -> Option<&'static str> {
        self.failure.as_ref().map(Error::code)
    }

    /// Convert into a `Result` carrying the output path
    pub fn into_result(self) -> Result<PathBuf> {
        match (self.failure, self.output_path) {
            (Some(error), _) => Err(error),
            (None, Some(path)) => Ok(path),
            (None, None) => Err(Error::ExternalTool(
                "pipeline finished without an output path".to_string(),
            )),
        }
    }
}

/// Event emitted by the pipeline
///
/// Subscribe with [`MediaPipeline::subscribe`](crate::MediaPipeline::subscribe).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A run entered a new stage
    StageChanged {
        /// Source URL of the run
        source_url: String,
        /// Session, once allocated
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        /// The stage entered
        stage: Stage,
    },

    /// One stream fetch finished
    StreamFetched {
        /// Session of the run
        session_id: SessionId,
        /// Which stream
        stream: StreamKind,
        /// Whether the fetch succeeded
        succeeded: bool,
    },

    /// A temp file could not be removed
    CleanupWarning {
        /// Session of the run
        session_id: SessionId,
        /// The file left behind
        path: PathBuf,
        /// Why removal failed
        reason: String,
    },

    /// A run produced its merged output
    Completed {
        /// Session of the run
        session_id: SessionId,
        /// The merged file
        output_path: PathBuf,
    },

    /// A run failed
    Failed {
        /// Source URL of the run
        source_url: String,
        /// Session, if one was allocated
        #[serde(skip_serializing_if = "Option::is_none")]
        session_id: Option<SessionId>,
        /// Machine-readable failure code
        code: String,
        /// Human-readable failure reason
        error: String,
    },
}
