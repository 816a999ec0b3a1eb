//! Utility functions for file naming and file checks

use std::path::Path;

/// Maximum number of stderr lines kept in error messages
const MAX_STDERR_LINES: usize = 20;

/// Characters that are never allowed in an output file name
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Make a media title safe to use as a file name
///
/// Removes `<>:"/\|?*` and ASCII control characters (0x00-0x1F), then trims
/// surrounding whitespace. When `max_chars` is set the result is cut to at
/// most that many characters and trimmed again, so applying the function
/// twice gives the same result as applying it once.
///
/// # Examples
///
/// ```
/// use media_merge_dl::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("  AC/DC: Live? ", None), "ACDC Live");
/// assert_eq!(sanitize_filename("abcdef", Some(3)), "abc");
/// ```
#[must_use]
pub fn sanitize_filename(raw: &str, max_chars: Option<usize>) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c) && !is_ascii_control(*c))
        .collect();
    let trimmed = cleaned.trim();

    match max_chars {
        Some(limit) if trimmed.chars().count() > limit => trimmed
            .chars()
            .take(limit)
            .collect::<String>()
            .trim()
            .to_string(),
        _ => trimmed.to_string(),
    }
}

// 0x7F is left alone on purpose; only the C0 range is stripped.
fn is_ascii_control(c: char) -> bool {
    (c as u32) < 0x20
}

/// Condense tool stderr into an error message
///
/// Keeps the last 20 non-empty lines, trimmed.
pub fn summarize_stderr(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(MAX_STDERR_LINES);
    lines[start..].join("\n")
}

/// Size of the file at `path`, or `None` if it does not exist or is not a file
pub async fn file_size(path: &Path) -> Option<u64> {
    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_file() => Some(meta.len()),
        _ => None,
    }
}

/// Whether `path` is an existing regular file with at least one byte
pub async fn has_data(path: &Path) -> bool {
    file_size(path).await.is_some_and(|len| len > 0)
}
