//! Per-file content digests.
//!
//! Digests are change-detection fingerprints, not a security boundary.
//! A 128-bit BLAKE2b output keeps the published tree compact while the
//! collision probability stays negligible for this workload.

use std::path::Path;

use blake2::digest::consts::U16;
use blake2::{Blake2b, Digest};
use tokio::fs;
use tokio::io::AsyncReadExt;

use packmirror_common::Result;

type Blake2b128 = Blake2b<U16>;

/// Read buffer size for streamed hashing.
const READ_BUF_SIZE: usize = 64 * 1024;

/// Compute the content digest of a file, reading it as a byte stream.
///
/// # Errors
/// - `Error::Io` if the file cannot be opened or a read fails mid-stream
pub async fn hash_file(path: impl AsRef<Path>) -> Result<String> {
    let mut file = fs::File::open(path.as_ref()).await?;
    let mut hasher = Blake2b128::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Compute the content digest of an in-memory byte slice.
///
/// Produces the same digest `hash_file` would for a file with these bytes.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Blake2b128::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
