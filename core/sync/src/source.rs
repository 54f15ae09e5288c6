//! Content source trait definition.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::{Deserialize, Serialize};

use packmirror_common::{Profile, Result, TreePath};
use packmirror_tree::TreeNode;

/// Byte stream type for file downloads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Wire shape of the fileCount endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FileCount {
    pub count: u64,
}

/// A remote peer that publishes a content tree.
///
/// The reconciler only talks to an origin through this trait, so tests run
/// against an in-memory implementation and production against HTTP.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Identifier for logs and failover reports (e.g. the base URL).
    fn name(&self) -> &str;

    /// Fetch the origin's published fingerprint tree.
    ///
    /// # Errors
    /// - `Error::Network` if the origin is unreachable
    /// - `Error::Protocol` if the response is not a valid tree
    async fn fetch_tree(&self) -> Result<TreeNode>;

    /// Fetch the origin's distributable profile list.
    async fn fetch_profiles(&self) -> Result<Vec<Profile>>;

    /// Total file count under a named game folder, used to normalize
    /// progress percentages.
    async fn file_count(&self, game_folder: &str) -> Result<u64>;

    /// Open a streamed download of one file in the published tree.
    ///
    /// # Errors
    /// - `Error::Network` on non-success status or transport failure
    async fn fetch_file(&self, path: &TreePath) -> Result<ByteStream>;
}
