use crate::config;
use std::{fs, io, path::{Path, PathBuf}};

/// Ensure the parent directory of a *file path* exists (no-op if none).
pub fn ensure_parent_dir<P: AsRef<Path>>(file_path: P) -> io::Result<()> {
    if let Some(parent) = file_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Global storage root (absolute), from `config::storage_root()`.
/// If relative in env, resolve against current_dir().
pub fn storage_root() -> PathBuf {
    let p = PathBuf::from(config::storage_root());
    if p.is_absolute() {
        p
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(p)
    }
}

/// Top-level folder for uploaded submissions, relative to the storage root.
pub const SUBMISSIONS_DIR: &str = "submissions";

/// Folder segment for one owner: `user_{owner_id}`
pub fn owner_segment(owner_id: i64) -> String {
    format!("user_{owner_id}")
}

/// Reduce a client-supplied filename to a single safe path segment.
///
/// Directory components (either separator) are dropped and leading dots are stripped,
/// so the result can never escape its parent folder. Empty results become `upload`.
pub fn sanitize_filename(filename: &str) -> String {
    let last = filename
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();
    let cleaned: String = last
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| !c.is_control())
        .collect();

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
