//! Cleanup stage for removing session temp files

use crate::error::CleanupWarning;
use crate::session::DownloadSession;
use std::io::ErrorKind;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Execute the cleanup stage
///
/// Removes the session's known temp paths plus every other entry in the
/// output directory carrying the session token, such as the `.ytdl` and
/// `.part-FragN` files yt-dlp leaves behind after a fragmented download.
///
/// Each file is handled on its own: a file that cannot be removed is
/// recorded as a [`CleanupWarning`] and the remaining files are still
/// processed. Files that are already gone are skipped silently. The session
/// is marked cleaned afterwards, so its drop guard has nothing left to do.
pub(crate) async fn run_cleanup_stage(session: &mut DownloadSession) -> Vec<CleanupWarning> {
    let session_id = session.id();
    debug!(%session_id, "running cleanup stage");

    let mut candidates = session.temp_paths();
    match owned_entries(session).await {
        Ok(found) => {
            for path in found {
                if !candidates.contains(&path) {
                    candidates.push(path);
                }
            }
        }
        Err(e) => {
            warn!(%session_id, dir = ?session.output_directory(), error = %e, "failed to scan output directory");
        }
    }

    let mut removed = 0usize;
    let mut warnings = Vec::new();

    for path in candidates {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(%session_id, ?path, "removed temp file");
                removed += 1;
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(%session_id, ?path, error = %e, "failed to remove temp file");
                warnings.push(CleanupWarning {
                    path,
                    reason: e.to_string(),
                });
            }
        }
    }

    session.mark_cleaned();

    info!(
        %session_id,
        removed,
        warnings = warnings.len(),
        "cleanup complete"
    );

    warnings
}

/// Entries of the output directory that belong to `session`
async fn owned_entries(session: &DownloadSession) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(session.output_directory()).await?;
    let mut owned = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if session.owns_entry(&entry.file_name()) {
            owned.push(entry.path());
        }
    }
    Ok(owned)
}
