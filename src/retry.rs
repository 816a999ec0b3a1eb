//! Caller-side retry with exponential backoff
//!
//! The pipeline itself never retries: a failed fetch or merge is reported
//! once. Callers that want another attempt wrap a whole run with
//! [`run_with_retry`], which backs off exponentially (optionally with jitter)
//! and stops early on errors that another attempt cannot fix.
//!
//! # Example
//!
//! ```no_run
//! use media_merge_dl::retry::run_with_retry;
//! use media_merge_dl::{Config, MediaPipeline, MediaRequest, RetryConfig};
//!
//! # async fn example() -> media_merge_dl::Result<()> {
//! let config = Config::default();
//! let pipeline = MediaPipeline::new(config.clone())?;
//! let request = MediaRequest::new("https://example.com/watch?v=1", "./out", &config);
//!
//! let pipeline = &pipeline;
//! let path = run_with_retry(&RetryConfig::default(), || {
//!     let request = request.clone();
//!     async move { pipeline.run(request).await.into_result() }
//! })
//! .await?;
//! println!("saved to {}", path.display());
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::{Error, FetchError, ProbeError};
use rand::Rng;
use std::future::Future;
use std::io::ErrorKind;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Tool { .. } | FetchError::EmptyOutput { .. } | FetchError::Timeout { .. } => {
                true
            }
            // Aborted tasks mean cancellation or a panic, neither of which heals.
            FetchError::Aborted { .. } => false,
        }
    }
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::MetadataProbe(ProbeError::Unreachable { .. } | ProbeError::Timeout { .. }) => {
                true
            }
            Error::MetadataProbe(_) => false,
            Error::StreamFetch(failures) => {
                !failures.is_empty() && failures.iter().all(IsRetryable::is_retryable)
            }
            Error::Io(e) => matches!(
                e.kind(),
                ErrorKind::TimedOut
                    | ErrorKind::ConnectionRefused
                    | ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::Interrupted
            ),
            Error::ExternalTool(msg) => {
                let msg = msg.to_lowercase();
                msg.contains("timed out") || msg.contains("temporary") || msg.contains("connection")
            }
            Error::Config { .. }
            | Error::DirectoryCreation { .. }
            | Error::Merge(_)
            | Error::Cancelled { .. }
            | Error::NotSupported(_)
            | Error::Serialization(_) => false,
        }
    }
}

/// Run an async operation, retrying transient failures with backoff
///
/// The operation runs once, then up to `max_attempts` more times while it
/// keeps failing with a retryable error. Returns the first success or the
/// last error.
pub async fn run_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut retries = 0u32;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(attempts = retries + 1, "operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !error.is_retryable() {
            tracing::warn!(error = %error, "operation failed with non-retryable error");
            return Err(error);
        }
        if retries >= config.max_attempts {
            tracing::warn!(error = %error, attempts = retries + 1, "retry attempts exhausted");
            return Err(error);
        }

        retries += 1;
        let wait = if config.jitter { add_jitter(delay) } else { delay };
        tracing::warn!(
            error = %error,
            retry = retries,
            max_attempts = config.max_attempts,
            delay_ms = wait.as_millis(),
            "operation failed, retrying"
        );
        tokio::time::sleep(wait).await;

        delay = next_delay(delay, config);
    }
}

/// Grow `delay` by the backoff multiplier, capped at `max_delay`
///
/// Saturates at `max_delay` when the product is not a representable
/// duration (overflow, NaN or negative multiplier).
fn next_delay(delay: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
}

/// Stretch `delay` by a random factor in `[1, 2]`
fn add_jitter(delay: Duration) -> Duration {
    let fraction: f64 = rand::thread_rng().gen_range(0.0..=1.0);
    let extra = Duration::try_from_secs_f64(delay.as_secs_f64() * fraction)
        .unwrap_or(Duration::ZERO)
        .min(delay);
    delay.saturating_add(extra)
}
