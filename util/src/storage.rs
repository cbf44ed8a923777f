//! Durable blob storage for submitted files.
//!
//! Paths are backend-neutral [`BlobPath`]s (slash separated, relative to the storage root).
//! Every backend must make `save` write-once: saving to a path that already holds a blob
//! leaves the existing blob untouched and reports success.

use crate::paths;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tempfile::NamedTempFile;

/// Relative, slash separated location of a blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobPath(String);

impl BlobPath {
    /// Joins already-safe segments. Callers sanitize user input first.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = segments
            .into_iter()
            .map(|s| s.as_ref().to_string())
            .collect::<Vec<_>>()
            .join("/");
        Self(joined)
    }

    /// Parses a stored path, refusing anything that could leave the storage root.
    pub fn parse(value: &str) -> Option<Self> {
        let ok = !value.is_empty()
            && !value.contains('\\')
            && value
                .split('/')
                .all(|seg| !seg.is_empty() && seg != "." && seg != "..");
        ok.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl TryFrom<String> for BlobPath {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BlobPath::parse(&value).ok_or_else(|| format!("invalid blob path '{value}'"))
    }
}

impl From<BlobPath> for String {
    fn from(value: BlobPath) -> Self {
        value.0
    }
}

impl std::fmt::Display for BlobPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend for write-once blob storage.
pub trait BlobStorage: Send + Sync {
    fn exists(&self, path: &BlobPath) -> io::Result<bool>;

    /// Streams `content` into `path`. A blob only becomes visible once fully written; if
    /// one is already present the call is a successful no-op.
    fn save(&self, path: &BlobPath, content: &mut dyn Read) -> io::Result<()>;

    fn open(&self, path: &BlobPath) -> io::Result<Box<dyn Read + Send>>;
}

/// Stores blobs as files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Storage rooted at the configured `STORAGE_ROOT`.
    pub fn from_config() -> Self {
        Self::new(paths::storage_root())
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    pub fn resolve(&self, path: &BlobPath) -> PathBuf {
        path.segments()
            .fold(self.root.clone(), |acc, seg| acc.join(seg))
    }
}

impl BlobStorage for FileSystemStorage {
    fn exists(&self, path: &BlobPath) -> io::Result<bool> {
        match fs::metadata(self.resolve(path)) {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn save(&self, path: &BlobPath, content: &mut dyn Read) -> io::Result<()> {
        let target = self.resolve(path);
        paths::ensure_parent_dir(&target)?;
        let dir = target.parent().unwrap_or(&self.root);

        // Staged next to the target so the final rename stays on one filesystem.
        let mut staged = NamedTempFile::new_in(dir)?;
        io::copy(content, &mut staged)?;
        staged.flush()?;
        staged.as_file().sync_all()?;

        match staged.persist_noclobber(&target) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                tracing::debug!(path = %path, "blob already present, keeping existing copy");
                Ok(())
            }
            Err(e) => Err(e.error),
        }
    }

    fn open(&self, path: &BlobPath) -> io::Result<Box<dyn Read + Send>> {
        let file = File::open(self.resolve(path))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Process-local backend, used by tests and throwaway deployments.
///
/// Counts physical writes so callers can observe that repeated saves were no-ops.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    blobs: Mutex<HashMap<BlobPath, Vec<u8>>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of saves that actually stored bytes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, path: &BlobPath) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(path).cloned()
    }

    fn lock(&self) -> io::Result<std::sync::MutexGuard<'_, HashMap<BlobPath, Vec<u8>>>> {
        self.blobs
            .lock()
            .map_err(|_| io::Error::other("memory storage lock poisoned"))
    }
}

impl BlobStorage for MemoryStorage {
    fn exists(&self, path: &BlobPath) -> io::Result<bool> {
        Ok(self.lock()?.contains_key(path))
    }

    fn save(&self, path: &BlobPath, content: &mut dyn Read) -> io::Result<()> {
        // Read fully before taking the lock; a failed read never publishes anything.
        let mut bytes = Vec::new();
        content.read_to_end(&mut bytes)?;

        let mut blobs = self.lock()?;
        if !blobs.contains_key(path) {
            blobs.insert(path.clone(), bytes);
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn open(&self, path: &BlobPath) -> io::Result<Box<dyn Read + Send>> {
        let bytes = self
            .lock()?
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no blob at {path}")))?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
