//! Fetch-and-merge pipeline
//!
//! One run takes a media URL to a single merged file:
//! 1. Probe - read the title through the extractor
//! 2. Allocate - create the output directory and a session temp namespace
//! 3. Fetch - download the video and audio streams concurrently
//! 4. Merge - stream-copy both into one container (skipped if a fetch failed)
//! 5. Cleanup - remove every session temp file, whatever happened before
//!
//! Stage errors are captured as values so cleanup always runs; the run ends
//! in a single [`MergeOutcome`].

use crate::config::{Config, ToolsConfig};
use crate::error::{Error, FetchError, ProbeError, Result};
use crate::extractor::{CliExtractor, MediaExtractor, NoOpExtractor};
use crate::muxer::{FfmpegMuxer, Muxer, NoOpMuxer};
use crate::session::{DownloadSession, allocate_session};
use crate::types::{Event, MediaMetadata, MediaRequest, MergeOutcome, SessionId, Stage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Semaphore, broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

mod cleanup;
mod fetch;
mod remux;

use cleanup::run_cleanup_stage;
use fetch::fetch_streams;
use remux::run_remux_stage;

/// Capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Pipeline that downloads a video stream and an audio stream and merges them
///
/// Cheap to share: wrap it in an `Arc` and call [`run`](Self::run) from as
/// many tasks as needed. All runs on one instance share a pool of
/// `max_workers` fetch slots; each run keeps its temp files in its own
/// session namespace, so runs may target the same output directory.
///
/// # Examples
///
/// ```no_run
/// use media_merge_dl::{Config, MediaPipeline, MediaRequest};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config::default();
/// let pipeline = MediaPipeline::new(config.clone())?;
///
/// let request = MediaRequest::new(
///     "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
///     "./downloads",
///     &config,
/// );
/// let outcome = pipeline.run(request).await;
/// match outcome.into_result() {
///     Ok(path) => println!("saved to {}", path.display()),
///     Err(e) => eprintln!("failed: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
pub struct MediaPipeline {
    config: Arc<Config>,
    extractor: Arc<dyn MediaExtractor>,
    muxer: Arc<dyn Muxer>,
    workers: Arc<Semaphore>,
    event_tx: broadcast::Sender<Event>,
}

impl MediaPipeline {
    /// Create a pipeline backed by the external yt-dlp and ffmpeg binaries
    ///
    /// Binaries come from the configured paths, or from PATH when
    /// `search_path` is enabled. A missing binary is not an error here: the
    /// pipeline falls back to a no-op backend: runs then fail at the probe
    /// with `metadata_probe_failed`, or at the merge with `merge_tool_failed`,
    /// until the tool is installed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn new(config: Config) -> Result<Self> {
        let extractor = discover_extractor(&config.tools);
        let muxer = discover_muxer(&config.tools);

        info!(
            extractor = extractor.name(),
            muxer = muxer.name(),
            "media backends initialized"
        );

        Self::with_backends(config, extractor, muxer)
    }

    /// Create a pipeline with explicit extraction and muxing backends
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid.
    pub fn with_backends(
        config: Config,
        extractor: Arc<dyn MediaExtractor>,
        muxer: Arc<dyn Muxer>,
    ) -> Result<Self> {
        config.validate()?;

        let workers = Arc::new(Semaphore::new(config.concurrency.max_workers));
        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            config: Arc::new(config),
            extractor,
            muxer,
            workers,
            event_tx,
        })
    }

    /// Subscribe to pipeline events
    ///
    /// Receivers only see events sent after they subscribe. Slow receivers
    /// may lag and miss events; runs never wait on subscribers.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    /// Download and merge using positional arguments
    ///
    /// Equivalent to building a [`MediaRequest`] and calling [`run`](Self::run).
    pub async fn download(
        &self,
        source_url: &str,
        output_directory: impl AsRef<Path>,
        video_format: &str,
        audio_format: &str,
        output_filename: Option<&str>,
    ) -> MergeOutcome {
        let mut request = MediaRequest::new(source_url, output_directory.as_ref(), &self.config)
            .with_video_format(video_format)
            .with_audio_format(audio_format);
        if let Some(name) = output_filename {
            request = request.with_output_filename(name);
        }
        self.run(request).await
    }

    /// Run the pipeline to completion
    pub async fn run(&self, request: MediaRequest) -> MergeOutcome {
        self.run_with_cancel(request, CancellationToken::new()).await
    }

    /// Run the pipeline, stopping early when `cancel` fires
    ///
    /// Cancellation kills in-flight tool processes; cleanup still runs and
    /// the outcome fails with code `cancelled`.
    pub async fn run_with_cancel(
        &self,
        request: MediaRequest,
        cancel: CancellationToken,
    ) -> MergeOutcome {
        let url = request.source_url.as_str();
        info!(url, output_directory = ?request.output_directory, "starting media pipeline");

        self.enter_stage(url, None, Stage::ProbingMetadata);
        let metadata = match self.probe(url, &cancel).await {
            Ok(metadata) => metadata,
            Err(e) => return self.finish_failed(url, None, e, Vec::new()),
        };
        info!(url, title = %metadata.title, "metadata probed");

        self.enter_stage(url, None, Stage::AllocatingSession);
        let mut session = match allocate_session(
            &request.output_directory,
            &metadata,
            request.output_filename.as_deref(),
            &self.config.output,
        )
        .await
        {
            Ok(session) => session,
            Err(e) => return self.finish_failed(url, None, e, Vec::new()),
        };
        let session_id = session.id();

        let result = self.fetch_and_merge(&request, &session, &cancel).await;

        self.enter_stage(url, Some(session_id), Stage::CleaningUp);
        let warnings = run_cleanup_stage(&mut session).await;
        for warning in &warnings {
            self.event_tx
                .send(Event::CleanupWarning {
                    session_id,
                    path: warning.path.clone(),
                    reason: warning.reason.clone(),
                })
                .ok();
        }

        match result {
            Ok(output_path) => {
                self.enter_stage(url, Some(session_id), Stage::Succeeded);
                info!(%session_id, output = ?output_path, "media pipeline succeeded");
                self.event_tx
                    .send(Event::Completed {
                        session_id,
                        output_path: output_path.clone(),
                    })
                    .ok();
                MergeOutcome::success(session_id, output_path).with_cleanup_warnings(warnings)
            }
            Err(e) => self.finish_failed(url, Some(session_id), e, warnings),
        }
    }

    async fn probe(&self, url: &str, cancel: &CancellationToken) -> Result<MediaMetadata> {
        let probe = self.extractor.probe_metadata(url);
        let timed = async {
            match self.config.timeouts.probe_timeout {
                Some(limit) => match tokio::time::timeout(limit, probe).await {
                    Ok(result) => result,
                    Err(_) => Err(ProbeError::Timeout { after: limit }.into()),
                },
                None => probe.await,
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled { stage: Stage::ProbingMetadata }),
            result = timed => result,
        };

        // Anything that stops the probe is a probe failure, including an
        // extractor binary that cannot be spawned at all.
        result.map_err(|e| match e {
            Error::MetadataProbe(_) | Error::Cancelled { .. } => e,
            Error::ExternalTool(reason) | Error::NotSupported(reason) => {
                ProbeError::ExtractorUnavailable {
                    url: url.to_string(),
                    reason,
                }
                .into()
            }
            other => ProbeError::Unreachable {
                url: url.to_string(),
                reason: other.to_string(),
            }
            .into(),
        })
    }

    /// Fetch both streams, then merge them if both arrived
    ///
    /// Returns the final output path. Any error here still leads to cleanup.
    async fn fetch_and_merge(
        &self,
        request: &MediaRequest,
        session: &DownloadSession,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let url = request.source_url.as_str();
        let session_id = session.id();

        self.enter_stage(url, Some(session_id), Stage::FetchingStreams);
        let (video, audio) = fetch_streams(
            &self.extractor,
            request,
            session,
            &self.workers,
            self.config.timeouts.fetch_timeout,
            cancel,
        )
        .await?;

        let mut failures: Vec<FetchError> = Vec::new();
        for result in [video, audio] {
            self.event_tx
                .send(Event::StreamFetched {
                    session_id,
                    stream: result.stream,
                    succeeded: result.succeeded,
                })
                .ok();
            failures.extend(result.error);
        }

        if !failures.is_empty() {
            self.enter_stage(url, Some(session_id), Stage::SkippingMerge);
            return Err(Error::StreamFetch(failures));
        }

        self.enter_stage(url, Some(session_id), Stage::MergingStreams);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled { stage: Stage::MergingStreams }),
            result = run_remux_stage(self.muxer.as_ref(), session, self.config.timeouts.merge_timeout) => result,
        }
    }

    fn enter_stage(&self, url: &str, session_id: Option<SessionId>, stage: Stage) {
        // Terminal stages are summarized by the caller, so they stay at debug.
        match (session_id, stage.is_terminal()) {
            (Some(id), false) => info!(session_id = %id, %stage, "entering stage"),
            (None, false) => info!(url, %stage, "entering stage"),
            (Some(id), true) => debug!(session_id = %id, %stage, "entering stage"),
            (None, true) => debug!(url, %stage, "entering stage"),
        }
        self.event_tx
            .send(Event::StageChanged {
                source_url: url.to_string(),
                session_id,
                stage,
            })
            .ok();
    }

    fn finish_failed(
        &self,
        url: &str,
        session_id: Option<SessionId>,
        error: Error,
        warnings: Vec<crate::error::CleanupWarning>,
    ) -> MergeOutcome {
        self.enter_stage(url, session_id, Stage::Failed);
        warn!(url, session_id = ?session_id.map(|id| id.to_string()), code = error.code(), error = %error, "media pipeline failed");
        self.event_tx
            .send(Event::Failed {
                source_url: url.to_string(),
                session_id,
                code: error.code().to_string(),
                error: error.to_string(),
            })
            .ok();
        MergeOutcome::failure(session_id, error).with_cleanup_warnings(warnings)
    }
}

fn discover_extractor(tools: &ToolsConfig) -> Arc<dyn MediaExtractor> {
    if let Some(ref path) = tools.ytdlp_path {
        Arc::new(CliExtractor::new(path.clone()))
    } else if tools.search_path
        && let Some(extractor) = CliExtractor::from_path()
    {
        Arc::new(extractor)
    } else {
        warn!("yt-dlp not found; media extraction is unavailable");
        Arc::new(NoOpExtractor)
    }
}

fn discover_muxer(tools: &ToolsConfig) -> Arc<dyn Muxer> {
    if let Some(ref path) = tools.ffmpeg_path {
        Arc::new(FfmpegMuxer::new(path.clone()))
    } else if tools.search_path
        && let Some(muxer) = FfmpegMuxer::from_path()
    {
        Arc::new(muxer)
    } else {
        warn!("ffmpeg not found; stream merging is unavailable");
        Arc::new(NoOpMuxer)
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
