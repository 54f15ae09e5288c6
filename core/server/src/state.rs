//! Process-owned server state.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex, RwLock};

use packmirror_common::{Error, Profile, Result};
use packmirror_tree::TreeNode;

/// The state a server publishes to its peers.
#[derive(Debug, Clone)]
pub struct Published {
    /// Current fingerprint tree.
    pub tree: TreeNode,
    /// Current distributable profile list.
    pub profiles: Vec<Profile>,
    /// When the last successful rebuild finished.
    pub rebuilt_at: Option<DateTime<Utc>>,
}

impl Published {
    fn empty() -> Self {
        Self {
            tree: TreeNode::empty_branch(),
            profiles: Vec::new(),
            rebuilt_at: None,
        }
    }
}

/// Shared state for one server process.
///
/// Single-writer invariant: only the coordinator task calls `publish`;
/// request handlers read snapshots. The cycle mutex guarantees at most one
/// rebuild/reconciliation run per content root at a time, so a reload
/// trigger can never overlap a periodic tick.
pub struct ServerState {
    content_root: PathBuf,
    version: String,
    published: RwLock<Published>,
    reload_tx: mpsc::Sender<()>,
    cycle_lock: Mutex<()>,
}

impl ServerState {
    /// Create the state and the reload-trigger receiver consumed by the
    /// coordinator.
    pub fn new(content_root: PathBuf, version: String) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (reload_tx, reload_rx) = mpsc::channel(8);

        let state = Arc::new(Self {
            content_root,
            version,
            published: RwLock::new(Published::empty()),
            reload_tx,
            cycle_lock: Mutex::new(()),
        });

        (state, reload_rx)
    }

    /// Root of the content directory.
    pub fn content_root(&self) -> &PathBuf {
        &self.content_root
    }

    /// Build version served by GET /version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Snapshot of the currently published state.
    pub async fn snapshot(&self) -> Published {
        self.published.read().await.clone()
    }

    /// Replace the published state. Coordinator only.
    pub async fn publish(&self, tree: TreeNode, profiles: Vec<Profile>) {
        let mut published = self.published.write().await;
        *published = Published {
            tree,
            profiles,
            rebuilt_at: Some(Utc::now()),
        };
    }

    /// Request an out-of-band rebuild/reconcile cycle.
    pub async fn request_reload(&self) -> Result<()> {
        self.reload_tx
            .send(())
            .await
            .map_err(|_| Error::InvalidInput("coordinator not running".to_string()))
    }

    /// Serialize rebuild/reconciliation cycles for this content root.
    pub(crate) fn cycle_lock(&self) -> &Mutex<()> {
        &self.cycle_lock
    }
}
