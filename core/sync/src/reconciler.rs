//! The tree reconciler.
//!
//! Given a remote tree and a local tree, computes and executes the minimal
//! set of fetch/create/delete operations to make the local copy match the
//! remote, recursing into shared substructure. The remote tree is always
//! authoritative; local divergence is overwritten or deleted.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs;
use tracing::{debug, info};

use packmirror_common::{Error, Result, TreePath};
use packmirror_tree::TreeNode;

use crate::fetcher::fetch_file;
use crate::policy::{SyncPolicy, SyncScope};
use crate::progress::ProgressTracker;
use crate::source::ContentSource;

/// Operation counts from one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Files downloaded (missing or digest mismatch).
    pub files_fetched: u64,
    /// Local-only files removed, including files under removed subtrees.
    pub files_deleted: u64,
    /// Directories created.
    pub dirs_created: u64,
}

/// Drives one local content root to match a remote tree.
///
/// The local tree is mutated in place as entries are created and deleted,
/// so it must be exclusively owned by the single in-flight run. A failed
/// fetch aborts the run; bookkeeping for already-processed siblings stays
/// intact and nothing the remote still has is ever deleted first.
pub struct Reconciler<'a> {
    source: &'a dyn ContentSource,
    policy: &'a SyncPolicy,
    progress: &'a ProgressTracker,
    remote_prefix: TreePath,
}

impl<'a> Reconciler<'a> {
    /// Create a reconciler for one run.
    ///
    /// When the policy scope is a named subtree, fetched file paths are
    /// prefixed with that subtree so they resolve inside the origin's
    /// published tree.
    pub fn new(
        source: &'a dyn ContentSource,
        policy: &'a SyncPolicy,
        progress: &'a ProgressTracker,
    ) -> Self {
        let remote_prefix = match &policy.scope {
            SyncScope::Whole => TreePath::root(),
            SyncScope::Subtree(path) => path.clone(),
        };

        Self {
            source,
            policy,
            progress,
            remote_prefix,
        }
    }

    /// Reconcile `local_root` to match `remote_tree`.
    ///
    /// Both trees must be branches. Returns the operation counts; on error
    /// the run is aborted mid-way with the local directory left in a state
    /// where every already-processed file is current.
    pub async fn run(
        &self,
        local_root: &Path,
        local_tree: &mut TreeNode,
        remote_tree: &TreeNode,
    ) -> Result<ReconcileStats> {
        let remote = remote_tree
            .children()
            .ok_or_else(|| Error::InvalidInput("remote tree root must be a directory".into()))?;

        let local = local_tree
            .children_mut()
            .ok_or_else(|| Error::InvalidInput("local tree root must be a directory".into()))?;

        self.progress.begin(remote_tree.count_files());

        let mut stats = ReconcileStats::default();
        self.reconcile_dir(
            local_root.to_path_buf(),
            local,
            remote,
            TreePath::root(),
            &mut stats,
        )
        .await?;

        info!(
            fetched = stats.files_fetched,
            deleted = stats.files_deleted,
            dirs_created = stats.dirs_created,
            "reconciliation complete"
        );
        Ok(stats)
    }

    fn reconcile_dir<'b>(
        &'b self,
        local_dir: PathBuf,
        local: &'b mut BTreeMap<String, TreeNode>,
        remote: &'b BTreeMap<String, TreeNode>,
        rel: TreePath,
        stats: &'b mut ReconcileStats,
    ) -> BoxFuture<'b, Result<()>> {
        async move {
            for (name, remote_node) in remote {
                let child_fs = local_dir.join(name);

                match remote_node {
                    TreeNode::Leaf(remote_digest) => {
                        let needs_fetch = match local.get(name) {
                            None => true,
                            Some(TreeNode::Leaf(local_digest)) => local_digest != remote_digest,
                            Some(TreeNode::Branch(stale)) => {
                                // Type mismatch: folder became a file.
                                // Policy is delete local, recreate as
                                // remote's type.
                                stats.files_deleted += stale.values().map(TreeNode::count_files).sum::<u64>();
                                fs::remove_dir_all(&child_fs).await?;
                                local.remove(name);
                                true
                            }
                        };

                        if needs_fetch {
                            let remote_path = self.remote_path(&rel, name)?;
                            fetch_file(self.source, &remote_path, &child_fs).await?;
                            local.insert(name.clone(), TreeNode::Leaf(remote_digest.clone()));
                            stats.files_fetched += 1;
                        }

                        self.progress.file_done();
                    }
                    TreeNode::Branch(remote_children) => {
                        match local.get(name) {
                            Some(TreeNode::Branch(_)) => {}
                            Some(TreeNode::Leaf(_)) => {
                                // Type mismatch: file became a folder.
                                fs::remove_file(&child_fs).await?;
                                fs::create_dir_all(&child_fs).await?;
                                local.insert(name.clone(), TreeNode::empty_branch());
                                stats.files_deleted += 1;
                                stats.dirs_created += 1;
                            }
                            None => {
                                fs::create_dir_all(&child_fs).await?;
                                local.insert(name.clone(), TreeNode::empty_branch());
                                stats.dirs_created += 1;
                            }
                        }

                        let Some(TreeNode::Branch(local_children)) = local.get_mut(name) else {
                            return Err(Error::InvalidInput(format!(
                                "expected local directory entry for '{}'",
                                name
                            )));
                        };

                        self.reconcile_dir(
                            child_fs,
                            local_children,
                            remote_children,
                            rel.join(name)?,
                            stats,
                        )
                        .await?;
                    }
                }
            }

            self.delete_local_only(&local_dir, local, remote, &rel, stats)
                .await
        }
        .boxed()
    }

    /// Deletion pass: remove names present locally but absent from the
    /// same-level remote mapping, unless the entry lives under a skipped
    /// top-level segment.
    async fn delete_local_only(
        &self,
        local_dir: &Path,
        local: &mut BTreeMap<String, TreeNode>,
        remote: &BTreeMap<String, TreeNode>,
        rel: &TreePath,
        stats: &mut ReconcileStats,
    ) -> Result<()> {
        let local_only: Vec<String> = local
            .keys()
            .filter(|name| !remote.contains_key(*name))
            .cloned()
            .collect();

        for name in local_only {
            let top_level = rel.first().unwrap_or(&name);
            if self.policy.skips_deletion_under(top_level) {
                debug!(name = %name, top_level = %top_level, "deletion skipped by policy");
                continue;
            }

            let child_fs = local_dir.join(&name);
            match local.get(&name) {
                Some(TreeNode::Leaf(_)) => {
                    fs::remove_file(&child_fs).await?;
                    stats.files_deleted += 1;
                }
                Some(TreeNode::Branch(subtree)) => {
                    stats.files_deleted += subtree.values().map(TreeNode::count_files).sum::<u64>();
                    fs::remove_dir_all(&child_fs).await?;
                }
                None => {}
            }

            // Filesystem removal succeeded, update the bookkeeping.
            local.remove(&name);
            debug!(name = %name, "removed local-only entry");
        }

        Ok(())
    }

    fn remote_path(&self, rel: &TreePath, name: &str) -> Result<TreePath> {
        let mut path = self.remote_prefix.clone();
        for component in rel.components() {
            path = path.join(component)?;
        }
        path.join(name)
    }
}
