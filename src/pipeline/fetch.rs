//! Stream fetch stage: both streams downloaded concurrently

use crate::error::{Error, FetchError, Result};
use crate::extractor::MediaExtractor;
use crate::session::{DownloadSession, SessionFiles};
use crate::types::{MediaRequest, Stage, StreamFetchResult, StreamKind};
use crate::utils::has_data;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Download one stream and verify it landed on disk
///
/// Never returns `Err`: every failure becomes a [`StreamFetchResult`] with
/// `succeeded == false`. The destination is only inspected after the
/// extractor call has returned.
pub(crate) async fn fetch_stream(
    extractor: &dyn MediaExtractor,
    url: &str,
    stream: StreamKind,
    format: &str,
    destination: &Path,
    timeout: Option<Duration>,
) -> StreamFetchResult {
    debug!(%stream, format, ?destination, extractor = extractor.name(), "fetching stream");

    let fetch = extractor.fetch_stream(url, format, destination);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, fetch).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%stream, timeout_secs = limit.as_secs(), "stream fetch timed out");
                return StreamFetchResult::failure(FetchError::Timeout {
                    stream,
                    after: limit,
                });
            }
        },
        None => fetch.await,
    };

    if let Err(e) = result {
        warn!(%stream, format, error = %e, "stream fetch failed");
        let message = match e {
            Error::ExternalTool(message) => message,
            other => other.to_string(),
        };
        return StreamFetchResult::failure(FetchError::Tool { stream, message });
    }

    if !has_data(destination).await {
        warn!(%stream, ?destination, "stream fetch reported success but wrote no data");
        return StreamFetchResult::failure(FetchError::EmptyOutput {
            stream,
            path: destination.to_path_buf(),
        });
    }

    debug!(%stream, ?destination, "stream fetched");
    StreamFetchResult::success(stream, destination.to_path_buf())
}

/// Everything one fetch task needs, owned so the task can be spawned
struct FetchJob {
    extractor: Arc<dyn MediaExtractor>,
    url: String,
    stream: StreamKind,
    format: String,
    destination: PathBuf,
    timeout: Option<Duration>,
    files: Arc<SessionFiles>,
}

impl FetchJob {
    fn new(
        extractor: &Arc<dyn MediaExtractor>,
        request: &MediaRequest,
        session: &DownloadSession,
        stream: StreamKind,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            extractor: Arc::clone(extractor),
            url: request.source_url.clone(),
            stream,
            format: request.format_for(stream).to_string(),
            destination: session.temp_path(stream).to_path_buf(),
            timeout,
            files: session.share_files(),
        }
    }

    /// Spawn the fetch, holding a worker permit for its whole duration
    ///
    /// The task stops (dropping the extractor future, which kills any child
    /// process) as soon as `cancel` fires, whether it is still waiting for a
    /// permit or already downloading. The task keeps its handle on the
    /// session files until the extractor future is gone, so a dropped run
    /// sweeps its temp files only after the tool has stopped writing.
    fn spawn(self, workers: Arc<Semaphore>, cancel: CancellationToken) -> JoinHandle<StreamFetchResult> {
        tokio::spawn(async move {
            let FetchJob {
                extractor,
                url,
                stream,
                format,
                destination,
                timeout,
                files,
            } = self;
            let work = async {
                let Ok(_permit) = workers.acquire_owned().await else {
                    return StreamFetchResult::failure(FetchError::Aborted {
                        stream,
                        message: "worker pool closed".to_string(),
                    });
                };
                fetch_stream(extractor.as_ref(), &url, stream, &format, &destination, timeout).await
            };

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => StreamFetchResult::failure(FetchError::Aborted {
                    stream,
                    message: "cancelled".to_string(),
                }),
                result = work => result,
            };

            drop(files);
            result
        })
    }
}

async fn join_fetch(stream: StreamKind, handle: JoinHandle<StreamFetchResult>) -> StreamFetchResult {
    match handle.await {
        Ok(result) => result,
        Err(e) => StreamFetchResult::failure(FetchError::Aborted {
            stream,
            message: e.to_string(),
        }),
    }
}

/// Fetch the video and audio streams concurrently
///
/// Both fetches always run to completion (no fail-fast): the function waits
/// for both tasks before returning, so the caller never starts cleanup while
/// a download is still writing. Returns `(video, audio)`.
///
/// # Errors
///
/// Returns [`Error::Cancelled`] if `cancel` fired. Both tasks have stopped
/// by the time this returns.
pub(crate) async fn fetch_streams(
    extractor: &Arc<dyn MediaExtractor>,
    request: &MediaRequest,
    session: &DownloadSession,
    workers: &Arc<Semaphore>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
) -> Result<(StreamFetchResult, StreamFetchResult)> {
    // Fires if this future is dropped, so detached tasks never outlive the run.
    let run_token = cancel.child_token();
    let _stop_on_drop = run_token.clone().drop_guard();

    let video = FetchJob::new(extractor, request, session, StreamKind::Video, timeout)
        .spawn(Arc::clone(workers), run_token.clone());
    let audio = FetchJob::new(extractor, request, session, StreamKind::Audio, timeout)
        .spawn(Arc::clone(workers), run_token.clone());

    let (video, audio) = tokio::join!(
        join_fetch(StreamKind::Video, video),
        join_fetch(StreamKind::Audio, audio)
    );

    if cancel.is_cancelled() {
        return Err(Error::Cancelled {
            stage: Stage::FetchingStreams,
        });
    }

    Ok((video, audio))
}
