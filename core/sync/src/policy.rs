//! Per-call-site synchronization policy.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use packmirror_common::TreePath;

/// Which part of the remote tree a run reconciles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncScope {
    /// Reconcile the whole published tree.
    Whole,
    /// Reconcile a single named subtree of the published tree.
    Subtree(TreePath),
}

/// Policy knobs that vary between the three reconciler call sites.
///
/// Skip names exempt top-level directories from the deletion pass only;
/// entries under a skipped name are still created and updated, never
/// pruned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPolicy {
    /// Top-level names exempt from deletion.
    pub skip_top_level: BTreeSet<String>,
    /// Scope of the run.
    pub scope: SyncScope,
}

impl SyncPolicy {
    /// Full mirror: whole tree, nothing exempt from deletion.
    ///
    /// This is the replica policy.
    pub fn mirror() -> Self {
        Self {
            skip_top_level: BTreeSet::new(),
            scope: SyncScope::Whole,
        }
    }

    /// Launcher policy: one game folder subtree, user-owned directories
    /// preserved on deletion.
    pub fn game_folder(subtree: TreePath, skip: impl IntoIterator<Item = String>) -> Self {
        Self {
            skip_top_level: skip.into_iter().collect(),
            scope: SyncScope::Subtree(subtree),
        }
    }

    /// Add names to the deletion skip-list.
    pub fn with_skip(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.skip_top_level.extend(names);
        self
    }

    /// Whether deletion must leave entries under this top-level segment
    /// untouched.
    pub fn skips_deletion_under(&self, top_level: &str) -> bool {
        self.skip_top_level.contains(top_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror_policy_deletes_everywhere() {
        let policy = SyncPolicy::mirror();
        assert!(!policy.skips_deletion_under("config"));
        assert_eq!(policy.scope, SyncScope::Whole);
    }

    #[test]
    fn test_game_folder_policy() {
        let subtree = TreePath::parse("/gameFolders/skyblock").unwrap();
        let policy = SyncPolicy::game_folder(subtree.clone(), vec!["config".to_string()]);

        assert!(policy.skips_deletion_under("config"));
        assert!(!policy.skips_deletion_under("mods"));
        assert_eq!(policy.scope, SyncScope::Subtree(subtree));
    }
}
