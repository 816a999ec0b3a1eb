//! Custom assertions for pipeline tests

use media_merge_dl::{Event, SessionId};
use std::path::{Path, PathBuf};
use tokio::sync::broadcast;
use walkdir::WalkDir;

/// File name prefixes of session temp files
const TEMP_PREFIXES: &[&str] = &["video_", "audio_", "merge_"];

/// Every file under `dir` that looks like a session temp file
pub fn temp_files_in(dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            let name = entry.file_name().to_string_lossy();
            TEMP_PREFIXES.iter().any(|prefix| name.starts_with(prefix))
        })
        .map(|entry| entry.into_path())
        .collect()
}

/// Assert that no session temp file of any run remains under `dir`
pub fn assert_no_temp_files(dir: &Path) {
    let leftovers = temp_files_in(dir);
    assert!(
        leftovers.is_empty(),
        "temp files left behind: {:?}",
        leftovers
    );
}

/// Assert that no file carrying `session_id` in its name remains under `dir`
pub fn assert_no_session_files(dir: &Path, session_id: SessionId) {
    let token = session_id.to_string();
    let leftovers: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().contains(&token))
        .map(|entry| entry.into_path())
        .collect();
    assert!(
        leftovers.is_empty(),
        "files of session {} left behind: {:?}",
        token,
        leftovers
    );
}

/// All files directly under `dir`, sorted
pub fn files_in(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// Drain every event already sent to `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
