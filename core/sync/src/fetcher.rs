//! Streamed single-file retrieval into the local content directory.

use std::path::Path;

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use packmirror_common::{Result, TreePath};

use crate::source::{ByteStream, ContentSource};

/// Fetch one remote file into a local path, replacing any existing content.
///
/// Parent directories are created as needed. The destination is truncated
/// before the first byte is written, and the response body streams to disk
/// without buffering the whole file in memory. No internal retry; retry
/// policy belongs to the caller.
///
/// # Errors
/// - `Error::Network` from the source (non-success status, stream failure)
/// - `Error::Io` if the local write fails
pub async fn fetch_file(
    source: &dyn ContentSource,
    remote_path: &TreePath,
    dest: &Path,
) -> Result<()> {
    let stream = source.fetch_file(remote_path).await?;
    write_stream(dest, stream).await?;
    debug!(remote = %remote_path, local = %dest.display(), "fetched file");
    Ok(())
}

/// Write a byte stream to a file, truncating any previous content.
pub async fn write_stream(dest: &Path, mut stream: ByteStream) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).await?;
    }

    let mut file = fs::File::create(dest).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;

    Ok(())
}
