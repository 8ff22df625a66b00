//! Utility helpers: path resolution, date formatting, string manipulation.

use std::path::PathBuf;

/// Get the ChatAgent data directory (e.g. `~/.chatagent/`).
pub fn get_data_path() -> PathBuf {
    let home = home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".chatagent")
}

/// Like [`get_data_path`], creating the directory if it is missing.
pub fn ensure_data_path() -> std::io::Result<PathBuf> {
    let path = get_data_path();
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Get the default workspace path (e.g. `~/.chatagent/workspace/`).
pub fn get_default_workspace_path() -> PathBuf {
    get_data_path().join("workspace")
}

/// Current local time as RFC 3339.
pub fn timestamp() -> String {
    chrono::Local::now().to_rfc3339()
}

/// Current local time as `YYYY-MM-DD HH:MM:SS (Weekday)`.
pub fn now_with_weekday() -> String {
    chrono::Local::now()
        .format("%Y-%m-%d %H:%M:%S (%A)")
        .to_string()
}

/// Truncate a string to at most `max_len` characters, appending `suffix`
/// when anything was cut. Unicode-safe; the suffix does not count toward
/// `max_len`.
pub fn truncate_string(s: &str, max_len: usize, suffix: &str) -> String {
    match s.char_indices().nth(max_len) {
        None => s.to_string(),
        Some((byte_idx, _)) => format!("{}{}", &s[..byte_idx], suffix),
    }
}

/// Expand `~` to the home directory in a path string.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        home_dir().unwrap_or_else(|| PathBuf::from(".")).join(rest)
    } else if path == "~" {
        home_dir().unwrap_or_else(|| PathBuf::from("."))
    } else {
        PathBuf::from(path)
    }
}

fn home_dir() -> Option<PathBuf> {
    dirs_next::home_dir()
}
