//! Merge stage: stream-copy both temp files into the final container

use crate::error::{MergeError, Result};
use crate::muxer::Muxer;
use crate::session::DownloadSession;
use crate::utils::has_data;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Execute the merge stage
///
/// The muxer writes to the session's staging file, which is renamed onto the
/// final output path only once it holds data. A failed merge therefore never
/// leaves anything at the final path.
pub(crate) async fn run_remux_stage(
    muxer: &dyn Muxer,
    session: &DownloadSession,
    timeout: Option<Duration>,
) -> Result<PathBuf> {
    let session_id = session.id();
    let video = session.video_temp_path();
    let audio = session.audio_temp_path();
    let staging = session.merge_temp_path();

    for input in [video, audio] {
        if !has_data(input).await {
            warn!(%session_id, ?input, "merge input missing, not invoking merge tool");
            return Err(MergeError::MissingInput {
                path: input.to_path_buf(),
            }
            .into());
        }
    }

    debug!(%session_id, ?video, ?audio, ?staging, muxer = muxer.name(), "running merge tool");

    let merge = muxer.merge_streams(video, audio, staging);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, merge).await {
            Ok(result) => result,
            Err(_) => {
                warn!(%session_id, timeout_secs = limit.as_secs(), "merge timed out");
                return Err(MergeError::Timeout { after: limit }.into());
            }
        },
        None => merge.await,
    };

    let output = result.map_err(|e| MergeError::ToolFailed {
        status: None,
        stderr: e.to_string(),
    })?;

    if !output.success {
        warn!(%session_id, status = ?output.status, stderr = %output.stderr, "merge tool failed");
        return Err(MergeError::ToolFailed {
            status: output.status,
            stderr: output.stderr,
        }
        .into());
    }

    if !has_data(staging).await {
        error!(
            %session_id,
            ?staging,
            muxer = muxer.name(),
            "merge tool exited successfully but produced no output"
        );
        return Err(MergeError::MissingOutput {
            path: staging.to_path_buf(),
        }
        .into());
    }

    let destination = session.final_output_path();
    tokio::fs::rename(staging, destination)
        .await
        .map_err(|e| MergeError::Finalize {
            staging: staging.to_path_buf(),
            destination: destination.to_path_buf(),
            reason: e.to_string(),
        })?;

    info!(%session_id, output = ?destination, "streams merged");
    Ok(destination.to_path_buf())
}
