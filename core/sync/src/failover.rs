//! Ordered failover across multiple origins.

use std::path::Path;

use tokio::fs;
use tracing::{info, warn};

use packmirror_common::{Error, OriginFailure, Result};
use packmirror_tree::TreeBuilder;

use crate::policy::{SyncPolicy, SyncScope};
use crate::progress::ProgressTracker;
use crate::reconciler::{ReconcileStats, Reconciler};
use crate::source::ContentSource;

/// Result of a successful failover sync.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    /// The origin that served the run.
    pub origin: String,
    /// Operation counts from the run.
    pub stats: ReconcileStats,
}

/// Reconcile `local_root` against the first origin that yields a full
/// success.
///
/// Origins are tried in the order given; each failed attempt is recorded
/// and the next origin is tried. Exhausting the list surfaces
/// `Error::Failover` carrying every per-origin failure.
pub async fn sync_with_failover<S, F>(
    origins: &[String],
    make_source: F,
    local_root: &Path,
    policy: &SyncPolicy,
    progress: &ProgressTracker,
) -> Result<SyncOutcome>
where
    S: ContentSource,
    F: Fn(&str) -> Result<S>,
{
    if origins.is_empty() {
        return Err(Error::InvalidInput("no origins configured".to_string()));
    }

    let mut failures = Vec::new();

    for origin in origins {
        let attempt = async {
            let source = make_source(origin)?;
            sync_once(&source, local_root, policy, progress).await
        };

        match attempt.await {
            Ok(stats) => {
                info!(origin = %origin, "sync succeeded");
                return Ok(SyncOutcome {
                    origin: origin.clone(),
                    stats,
                });
            }
            Err(err) => {
                warn!(origin = %origin, error = %err, "origin failed, trying next");
                failures.push(OriginFailure {
                    origin: origin.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    Err(Error::Failover(failures))
}

/// One reconciliation attempt against a single source.
pub async fn sync_once<S: ContentSource>(
    source: &S,
    local_root: &Path,
    policy: &SyncPolicy,
    progress: &ProgressTracker,
) -> Result<ReconcileStats> {
    let full_tree = source.fetch_tree().await?;

    let remote_tree = match &policy.scope {
        SyncScope::Whole => full_tree,
        SyncScope::Subtree(path) => full_tree
            .descend(path)
            .cloned()
            .ok_or_else(|| Error::Protocol(format!("origin does not publish subtree {}", path)))?,
    };

    fs::create_dir_all(local_root).await?;
    let mut local_tree = TreeBuilder::new().build(local_root).await?;

    Reconciler::new(source, policy, progress)
        .run(local_root, &mut local_tree, &remote_tree)
        .await
}
