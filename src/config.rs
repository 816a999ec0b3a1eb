//! Configuration types for media-merge-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Default format selectors for the two streams
///
/// Selectors are opaque to this crate; they are handed to the extractor
/// unchanged. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Video stream selector (default: "bestvideo")
    #[serde(default = "default_video_format")]
    pub video_format: String,

    /// Audio stream selector (default: "bestaudio[ext=m4a]")
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            video_format: default_video_format(),
            audio_format: default_audio_format(),
        }
    }
}

/// Naming of temp files and the merged output
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Container extension of the video temp file, without dot (default: "mp4")
    #[serde(default = "default_video_extension")]
    pub video_extension: String,

    /// Container extension of the audio temp file, without dot (default: "m4a")
    #[serde(default = "default_audio_extension")]
    pub audio_extension: String,

    /// Extension of the merged output, without dot (default: "mp4")
    #[serde(default = "default_output_extension")]
    pub output_extension: String,

    /// Maximum characters kept from the sanitized title (default: 50, None = no cap)
    ///
    /// Long titles can exceed filesystem path limits once joined with the
    /// output directory.
    #[serde(default = "default_max_title_length")]
    pub max_title_length: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            video_extension: default_video_extension(),
            audio_extension: default_audio_extension(),
            output_extension: default_output_extension(),
            max_title_length: default_max_title_length(),
        }
    }
}

/// Worker pool sizing
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent stream fetches across all runs of one pipeline (default: 4)
    ///
    /// A value of 1 serializes the video and audio fetches.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
        }
    }
}

/// Per-stage time limits
///
/// A stage that exceeds its limit fails; its subprocess is killed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Metadata probe limit in seconds (default: 120)
    #[serde(default = "default_probe_timeout", with = "optional_duration_serde")]
    pub probe_timeout: Option<Duration>,

    /// Limit for each stream fetch in seconds (default: none)
    #[serde(default, with = "optional_duration_serde")]
    pub fetch_timeout: Option<Duration>,

    /// Merge limit in seconds (default: none)
    #[serde(default, with = "optional_duration_serde")]
    pub merge_timeout: Option<Duration>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            probe_timeout: default_probe_timeout(),
            fetch_timeout: None,
            merge_timeout: None,
        }
    }
}

/// External tool paths (yt-dlp, ffmpeg)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Path to yt-dlp executable (auto-detected if None)
    #[serde(default)]
    pub ytdlp_path: Option<PathBuf>,

    /// Path to ffmpeg executable (auto-detected if None)
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,

    /// Whether to search PATH for external binaries if explicit paths not set (default: true)
    #[serde(default = "default_true")]
    pub search_path: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: None,
            ffmpeg_path: None,
            search_path: true,
        }
    }
}

/// Main configuration for [`MediaPipeline`](crate::MediaPipeline)
///
/// Fields are organized into logical sub-configs:
/// - [`formats`](FormatConfig) - default stream selectors
/// - [`output`](OutputConfig) - temp and output naming
/// - [`concurrency`](ConcurrencyConfig) - worker pool size
/// - [`timeouts`](TimeoutConfig) - per-stage limits
/// - [`tools`](ToolsConfig) - external binary paths
///
/// All sub-config fields are flattened, so the JSON/TOML format has no nesting.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Default stream selectors
    #[serde(flatten)]
    pub formats: FormatConfig,

    /// Temp and output file naming
    #[serde(flatten)]
    pub output: OutputConfig,

    /// Worker pool size
    #[serde(flatten)]
    pub concurrency: ConcurrencyConfig,

    /// Per-stage time limits
    #[serde(flatten)]
    pub timeouts: TimeoutConfig,

    /// External binary paths
    #[serde(flatten)]
    pub tools: ToolsConfig,
}

impl Config {
    /// Check that every setting is usable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid key.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency.max_workers == 0 {
            return Err(config_error("max_workers", "must be at least 1"));
        }

        if self.formats.video_format.trim().is_empty() {
            return Err(config_error("video_format", "must not be empty"));
        }
        if self.formats.audio_format.trim().is_empty() {
            return Err(config_error("audio_format", "must not be empty"));
        }

        for (key, ext) in [
            ("video_extension", &self.output.video_extension),
            ("audio_extension", &self.output.audio_extension),
            ("output_extension", &self.output.output_extension),
        ] {
            validate_extension(key, ext)?;
        }

        if self.output.max_title_length == Some(0) {
            return Err(config_error(
                "max_title_length",
                "must be greater than 0 (use null to disable the cap)",
            ));
        }

        for (key, timeout) in [
            ("probe_timeout", self.timeouts.probe_timeout),
            ("fetch_timeout", self.timeouts.fetch_timeout),
            ("merge_timeout", self.timeouts.merge_timeout),
        ] {
            if timeout == Some(Duration::ZERO) {
                return Err(config_error(
                    key,
                    "must be greater than 0 (use null for no limit)",
                ));
            }
        }

        Ok(())
    }
}

/// Retry configuration for callers wrapping a whole pipeline run
///
/// The pipeline itself never retries; see [`crate::retry`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 2 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 60 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Validate the backoff settings
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `backoff_multiplier` is not a finite
    /// number of at least 1, or if `initial_delay` exceeds `max_delay`.
    pub fn validate(&self) -> Result<()> {
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(config_error(
                "backoff_multiplier",
                "must be a finite number of at least 1.0",
            ));
        }
        if self.initial_delay > self.max_delay {
            return Err(config_error("initial_delay", "must not exceed max_delay"));
        }
        Ok(())
    }
}

fn config_error(key: &str, message: &str) -> Error {
    Error::Config {
        message: format!("{} {}", key, message),
        key: Some(key.to_string()),
    }
}

fn validate_extension(key: &str, ext: &str) -> Result<()> {
    if ext.is_empty() {
        return Err(config_error(key, "must not be empty"));
    }
    if ext.starts_with('.') {
        return Err(config_error(key, "must not start with a dot"));
    }
    if ext.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(config_error(key, "must be ASCII alphanumeric"));
    }
    Ok(())
}

fn default_video_format() -> String {
    "bestvideo".to_string()
}

fn default_audio_format() -> String {
    "bestaudio[ext=m4a]".to_string()
}

fn default_video_extension() -> String {
    "mp4".to_string()
}

fn default_audio_extension() -> String {
    "m4a".to_string()
}

fn default_output_extension() -> String {
    "mp4".to_string()
}

fn default_max_title_length() -> Option<usize> {
    Some(50)
}

fn default_max_workers() -> usize {
    4
}

fn default_probe_timeout() -> Option<Duration> {
    Some(Duration::from_secs(120))
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(60)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}
