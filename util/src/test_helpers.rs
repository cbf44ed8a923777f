use crate::config::AppConfig;
use crate::storage::FileSystemStorage;
use tempfile::TempDir;

/// Creates a unique temporary directory and points the configured storage root at it
/// for the duration of the test. The directory is removed when the returned `TempDir`
/// is dropped.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
pub fn setup_test_storage_root() -> (TempDir, FileSystemStorage) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let abs = tmp
        .path()
        .canonicalize()
        .unwrap_or_else(|_| tmp.path().to_path_buf());
    AppConfig::set_storage_root(abs.to_string_lossy());
    let storage = FileSystemStorage::new(abs);
    (tmp, storage)
}
