//! Streaming content fingerprints.
//!
//! A fingerprint is the MD5 digest plus the byte count of a file's content.
//! MD5 because that is what the remote service reports for archived images
//! (`ArchivedMD5`), so local fingerprints compare directly against remote
//! truth. Determinism is the contract; collision resistance is not.

use md5::{Digest, Md5};
use std::fmt;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use crate::error::Result;

const READ_CHUNK: usize = 64 * 1024;

/// Content-derived identifier: 128-bit MD5 digest plus size in bytes.
///
/// Two files with identical bytes always yield identical fingerprints,
/// independent of filename or modification time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFingerprint {
    digest: [u8; 16],
    size: u64,
}

impl ContentFingerprint {
    pub fn new(digest: [u8; 16], size: u64) -> Self {
        Self { digest, size }
    }

    /// Lowercase hex encoding of the digest, as stored and as sent in the
    /// `Content-MD5` header.
    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest)
    }

    pub fn size(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for ContentFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.digest_hex(), self.size)
    }
}

/// Compute the fingerprint of a local file by streaming it once.
///
/// The file is consumed in fixed-size chunks; it is never buffered whole in
/// memory. An unreadable file yields [`crate::DedupError::Io`].
pub async fn fingerprint_file(path: &Path) -> Result<ContentFingerprint> {
    let mut file = File::open(path).await?;
    let mut hasher = Md5::new();
    let mut size = 0u64;
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        size += n as u64;
    }

    Ok(ContentFingerprint {
        digest: hasher.finalize().into(),
        size,
    })
}
