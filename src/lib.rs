//! # media-merge-dl
//!
//! Download the best video-only and audio-only streams of a media URL in
//! parallel, then remux them losslessly into one container.
//!
//! ## Design Philosophy
//!
//! media-merge-dl is designed to be:
//! - **Lossless** - Streams are copied into the output container, never re-encoded
//! - **Leak-free** - Temp files are removed on every exit path, including cancellation
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to stage events, no polling required
//!
//! Extraction and muxing go through the [`MediaExtractor`] and [`Muxer`] traits,
//! backed by the `yt-dlp` and `ffmpeg` binaries by default.
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_merge_dl::{Config, MediaPipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pipeline = MediaPipeline::new(Config::default())?;
//!
//!     // Subscribe to events
//!     let mut events = pipeline.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let outcome = pipeline
//!         .download(
//!             "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
//!             "./downloads",
//!             "bestvideo",
//!             "bestaudio[ext=m4a]",
//!             None,
//!         )
//!         .await;
//!     println!("{:?}", outcome.into_result()?);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Media extraction backends (yt-dlp)
pub mod extractor;
/// Stream muxing backends (ffmpeg)
pub mod muxer;
/// Fetch-and-merge pipeline
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// Per-run temp file namespace
pub mod session;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use config::{Config, RetryConfig};
pub use error::{CleanupWarning, Error, FetchError, MergeError, ProbeError, Result};
pub use extractor::{CliExtractor, MediaExtractor, NoOpExtractor};
pub use muxer::{FfmpegMuxer, MuxOutput, Muxer, NoOpMuxer};
pub use pipeline::MediaPipeline;
pub use session::{DownloadSession, allocate_session};
pub use types::{
    Event, MediaMetadata, MediaRequest, MergeOutcome, SessionId, Stage, StreamFetchResult,
    StreamKind,
};
pub use utils::sanitize_filename;

use tokio_util::sync::CancellationToken;

/// Run one pipeline request, cancelling it on a termination signal.
///
/// The run is cancelled on the first signal; in-flight tool processes are
/// killed and cleanup still runs before this returns.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_merge_dl::{Config, MediaPipeline, MediaRequest, run_until_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = Config::default();
///     let pipeline = MediaPipeline::new(config.clone())?;
///     let request = MediaRequest::new("https://example.com/watch?v=1", "./out", &config);
///
///     let outcome = run_until_shutdown(&pipeline, request).await;
///     if let Some(reason) = outcome.reason() {
///         eprintln!("{}", reason);
///     }
///     Ok(())
/// }
/// ```
pub async fn run_until_shutdown(pipeline: &MediaPipeline, request: MediaRequest) -> MergeOutcome {
    let cancel = CancellationToken::new();
    let run = pipeline.run_with_cancel(request, cancel.clone());
    tokio::pin!(run);

    tokio::select! {
        outcome = &mut run => outcome,
        _ = wait_for_signal() => {
            tracing::info!("cancelling media pipeline run");
            cancel.cancel();
            run.await
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM signal"),
                _ = sigint.recv() => tracing::info!("Received SIGINT signal (Ctrl+C)"),
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register any signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
