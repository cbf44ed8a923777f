//! Content fingerprints and the canonical blob path derived from them.
//!
//! A fingerprint is the SHA-1 of an upload's bytes rendered as lowercase hex. Together with
//! the owner and the (sanitized) filename it fully determines where the upload is stored,
//! which is what makes submissions content-addressed and safe to repeat.

use crate::paths::{owner_segment, sanitize_filename, SUBMISSIONS_DIR};
use crate::storage::BlobPath;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::fmt;
use std::io::{self, Read, Seek, SeekFrom};

/// Chunk size used when streaming an upload through the hasher.
pub const BLOCK_SIZE: usize = 8 * 1024;

/// Hex length of a SHA-1 digest.
const HEX_LEN: usize = 40;

/// Lowercase hex SHA-1 digest of a byte stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parses a previously rendered digest. Only 40 lowercase hex characters are accepted.
    pub fn from_hex(value: &str) -> Option<Self> {
        let valid = value.len() == HEX_LEN
            && value
                .chars()
                .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c));
        valid.then(|| Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Fingerprint::from_hex(&value).ok_or_else(|| format!("invalid fingerprint '{value}'"))
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

/// Hashes `stream` from its current position to the end in [`BLOCK_SIZE`] chunks.
///
/// The read position is restored before returning (also when a read fails), so the caller
/// can hand the same stream to storage without re-opening it.
pub fn fingerprint<R: Read + Seek + ?Sized>(stream: &mut R) -> io::Result<Fingerprint> {
    let start = stream.stream_position()?;
    let digest = digest_to_end(stream);
    stream.seek(SeekFrom::Start(start))?;
    Ok(Fingerprint(hex::encode(digest?)))
}

fn digest_to_end<R: Read + ?Sized>(stream: &mut R) -> io::Result<Vec<u8>> {
    let mut hasher = Sha1::new();
    let mut block = [0u8; BLOCK_SIZE];
    loop {
        match stream.read(&mut block) {
            Ok(0) => break,
            Ok(n) => hasher.update(&block[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(hasher.finalize().to_vec())
}

/// Canonical storage location: `submissions/user_{owner}/{digest}/{filename}`.
///
/// Pure; the digest gets its own segment so two different uploads with the same name never
/// share a path.
pub fn canonical_path(owner_id: i64, digest: &Fingerprint, filename: &str) -> BlobPath {
    BlobPath::from_segments([
        SUBMISSIONS_DIR.to_string(),
        owner_segment(owner_id),
        digest.to_string(),
        sanitize_filename(filename),
    ])
}
