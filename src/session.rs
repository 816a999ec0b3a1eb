//! Per-run temp file namespace
//!
//! A [`DownloadSession`] owns the temp files of one pipeline run. Every path
//! is derived from the run's random [`SessionId`], so runs sharing an output
//! directory never touch each other's files. Whatever is left of the temp
//! files is removed when the last handle on the session is dropped, so an
//! aborted run cannot leak them.

use crate::config::OutputConfig;
use crate::error::{Error, Result};
use crate::types::{MediaMetadata, SessionId, StreamKind};
use crate::utils::sanitize_filename;
use std::ffi::OsStr;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Prefix of the staging file the merge tool writes to
pub const MERGE_TEMP_PREFIX: &str = "merge_";

/// Suffix yt-dlp appends to files while they are being downloaded
const PARTIAL_SUFFIX: &str = ".part";

/// Temp file namespace of one pipeline run
#[derive(Debug)]
pub struct DownloadSession {
    files: Arc<SessionFiles>,
}

/// Paths of one session, shared with every task that writes them
///
/// Whoever releases the last handle removes the session's leftover files,
/// unless the cleanup stage has already run. Fetch tasks hold a handle, so a
/// run dropped mid-fetch sweeps the directory only after both tasks have
/// stopped their tools.
#[derive(Debug)]
pub(crate) struct SessionFiles {
    session_id: SessionId,
    output_directory: PathBuf,
    video_temp_path: PathBuf,
    audio_temp_path: PathBuf,
    merge_temp_path: PathBuf,
    final_output_path: PathBuf,
    cleaned: AtomicBool,
}

impl DownloadSession {
    /// Build the session paths without touching the filesystem
    ///
    /// `output_filename` takes precedence over the probed title. Both are
    /// sanitized; the title is also cut to `max_title_length`. An empty result
    /// falls back to `media_<token>`. The final name always ends in
    /// `output_extension`, which is appended to an override unless it
    /// already carries that extension.
    pub fn new(
        session_id: SessionId,
        output_directory: &Path,
        metadata: &MediaMetadata,
        output_filename: Option<&str>,
        output: &OutputConfig,
    ) -> Self {
        let token = session_id.to_string();
        let temp_path = |prefix: &str, ext: &str| {
            output_directory.join(format!("{}{}.{}", prefix, token, ext))
        };

        let file_name = final_file_name(
            &token,
            metadata,
            output_filename,
            &output.output_extension,
            output.max_title_length,
        );

        let files = SessionFiles {
            session_id,
            output_directory: output_directory.to_path_buf(),
            video_temp_path: temp_path(StreamKind::Video.temp_prefix(), &output.video_extension),
            audio_temp_path: temp_path(StreamKind::Audio.temp_prefix(), &output.audio_extension),
            merge_temp_path: temp_path(MERGE_TEMP_PREFIX, &output.output_extension),
            final_output_path: output_directory.join(file_name),
            cleaned: AtomicBool::new(false),
        };

        Self {
            files: Arc::new(files),
        }
    }

    /// Session token
    pub fn id(&self) -> SessionId {
        self.files.session_id
    }

    /// Directory holding every file of this session
    pub fn output_directory(&self) -> &Path {
        &self.files.output_directory
    }

    /// Temp file of the video stream
    pub fn video_temp_path(&self) -> &Path {
        &self.files.video_temp_path
    }

    /// Temp file of the audio stream
    pub fn audio_temp_path(&self) -> &Path {
        &self.files.audio_temp_path
    }

    /// Temp file of the given stream
    pub fn temp_path(&self, stream: StreamKind) -> &Path {
        match stream {
            StreamKind::Video => &self.files.video_temp_path,
            StreamKind::Audio => &self.files.audio_temp_path,
        }
    }

    /// Staging file written by the merge tool before it is moved into place
    pub fn merge_temp_path(&self) -> &Path {
        &self.files.merge_temp_path
    }

    /// Where the merged file ends up
    pub fn final_output_path(&self) -> &Path {
        &self.files.final_output_path
    }

    /// The temp paths this session writes, final output excluded
    ///
    /// Includes the `.part` files an interrupted yt-dlp download leaves next
    /// to each stream's destination. Other tool sidecars (`.ytdl`,
    /// `.part-FragN`) are found by [`owns_file_name`](Self::owns_file_name)
    /// when the cleanup stage scans the directory.
    pub fn temp_paths(&self) -> Vec<PathBuf> {
        self.files.temp_paths()
    }

    /// Whether `file_name` belongs to this session's temp namespace
    pub fn owns_file_name(&self, file_name: &str) -> bool {
        self.files.owns_file_name(file_name)
    }

    /// Whether a directory entry named `name` is a temp file of this session
    pub(crate) fn owns_entry(&self, name: &OsStr) -> bool {
        self.files.owns_entry(name)
    }

    /// Another handle on the session's files, keeping the drop sweep pending
    pub(crate) fn share_files(&self) -> Arc<SessionFiles> {
        Arc::clone(&self.files)
    }

    /// Record that the cleanup stage has run, disarming the drop sweep
    pub(crate) fn mark_cleaned(&mut self) {
        self.files.cleaned.store(true, Ordering::Release);
    }
}

impl SessionFiles {
    fn temp_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::with_capacity(5);
        for path in [&self.video_temp_path, &self.audio_temp_path] {
            paths.push(path.clone());
            paths.push(with_suffix(path, PARTIAL_SUFFIX));
        }
        paths.push(self.merge_temp_path.clone());
        paths
    }

    fn owns_file_name(&self, file_name: &str) -> bool {
        let token = self.session_id.to_string();
        [
            StreamKind::Video.temp_prefix(),
            StreamKind::Audio.temp_prefix(),
            MERGE_TEMP_PREFIX,
        ]
        .iter()
        .any(|prefix| {
            file_name
                .strip_prefix(prefix)
                .is_some_and(|rest| rest.starts_with(&token))
        })
    }

    fn owns_entry(&self, name: &OsStr) -> bool {
        name.to_str().is_some_and(|n| self.owns_file_name(n))
            && self.output_directory.join(name) != self.final_output_path
    }

    /// Known temp paths plus every other owned entry in the directory
    fn leftover_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.temp_paths();
        match std::fs::read_dir(&self.output_directory) {
            Ok(entries) => {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if self.owns_entry(&entry.file_name()) && !paths.contains(&path) {
                        paths.push(path);
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(session_id = %self.session_id, dir = ?self.output_directory, error = %e, "failed to scan output directory");
            }
        }
        paths
    }
}

impl Drop for SessionFiles {
    fn drop(&mut self) {
        if self.cleaned.load(Ordering::Acquire) {
            return;
        }

        // Reached when a run is dropped mid-flight (caller timeout, task abort).
        for path in self.leftover_paths() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    debug!(session_id = %self.session_id, ?path, "removed temp file on drop");
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(session_id = %self.session_id, ?path, error = %e, "failed to remove temp file on drop");
                }
            }
        }
    }
}

/// Allocate a session for one pipeline run
///
/// Generates a fresh session token, derives the session paths, and makes
/// sure `output_directory` exists.
///
/// # Errors
///
/// Returns [`Error::DirectoryCreation`] if the directory cannot be created.
pub async fn allocate_session(
    output_directory: &Path,
    metadata: &MediaMetadata,
    output_filename: Option<&str>,
    output: &OutputConfig,
) -> Result<DownloadSession> {
    tokio::fs::create_dir_all(output_directory)
        .await
        .map_err(|source| Error::DirectoryCreation {
            path: output_directory.to_path_buf(),
            source,
        })?;

    let session = DownloadSession::new(
        SessionId::generate(),
        output_directory,
        metadata,
        output_filename,
        output,
    );

    debug!(
        session_id = %session.id(),
        video = ?session.video_temp_path(),
        audio = ?session.audio_temp_path(),
        output = ?session.final_output_path(),
        "allocated download session"
    );

    Ok(session)
}

fn final_file_name(
    token: &str,
    metadata: &MediaMetadata,
    output_filename: Option<&str>,
    extension: &str,
    max_title_length: Option<usize>,
) -> String {
    if let Some(name) = output_filename.map(|n| sanitize_filename(n, None))
        && !name.is_empty()
    {
        let has_extension = Path::new(&name)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        return if has_extension {
            name
        } else {
            format!("{}.{}", name, extension)
        };
    }

    let title = sanitize_filename(&metadata.title, max_title_length);
    let stem = if title.is_empty() {
        format!("media_{}", token)
    } else {
        title
    };
    format!("{}.{}", stem, extension)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(suffix);
    PathBuf::from(os)
}
