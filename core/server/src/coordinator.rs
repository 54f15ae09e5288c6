//! Role coordinator: the single writer of published state.
//!
//! One coordinator task runs per server process. It performs a cycle at
//! startup, then on every interval tick and every reload trigger. A failed
//! cycle is logged and the previously published state stays up.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use packmirror_common::Result;
use packmirror_sync::{sync_once, ContentSource, HttpOrigin, ProgressTracker, SyncPolicy};
use packmirror_tree::TreeBuilder;

use crate::state::ServerState;
use crate::{bundle, profiles};

/// The replication role of a server process, fixed at startup.
#[derive(Debug, Clone)]
pub enum Role {
    /// This process is the ground truth. It loads the declared profiles,
    /// rebuilds bundles and republishes its own content directory.
    Origin {
        /// Path to the declarative profiles file.
        profiles_file: std::path::PathBuf,
    },
    /// This process mirrors one origin and republishes what it pulled.
    Replica {
        /// Base URL of the origin to mirror.
        origin_url: String,
    },
}

/// Drives periodic and on-demand rebuild/reconcile cycles.
pub struct Coordinator {
    state: Arc<ServerState>,
    role: Role,
    interval: Duration,
}

impl Coordinator {
    pub fn new(state: Arc<ServerState>, role: Role, interval: Duration) -> Self {
        Self {
            state,
            role,
            interval,
        }
    }

    /// Run cycles until the reload channel closes.
    ///
    /// The first interval tick fires immediately, which doubles as the
    /// startup cycle.
    pub async fn run(self, mut reload_rx: mpsc::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            let trigger = tokio::select! {
                _ = ticker.tick() => "schedule",
                reload = reload_rx.recv() => match reload {
                    Some(()) => "reload",
                    None => break,
                },
            };

            match self.cycle().await {
                Ok(()) => info!(trigger, "cycle complete"),
                Err(err) => error!(trigger, error = %err, "cycle failed, keeping previous state"),
            }
        }
    }

    /// One rebuild/reconcile cycle under the per-root cycle lock.
    pub(crate) async fn cycle(&self) -> Result<()> {
        let _guard = self.state.cycle_lock().lock().await;

        match &self.role {
            Role::Origin { profiles_file } => self.origin_cycle(profiles_file).await,
            Role::Replica { origin_url } => self.replica_cycle(origin_url).await,
        }
    }

    /// Origin: load profiles, rebuild tarballs, fingerprint the content
    /// directory and publish the result.
    async fn origin_cycle(&self, profiles_file: &std::path::Path) -> Result<()> {
        let root = self.state.content_root();
        tokio::fs::create_dir_all(root).await?;

        let profiles = profiles::load(profiles_file).await?;
        bundle::rebuild_tarballs(root, &profiles).await?;

        let tree = TreeBuilder::new().build(root).await?;
        self.state.publish(tree, profiles).await;
        Ok(())
    }

    /// Replica: pull profiles and content from the origin, then republish
    /// the local directory as fingerprinted after the pull.
    async fn replica_cycle(&self, origin_url: &str) -> Result<()> {
        let source = HttpOrigin::new(origin_url)?;
        self.mirror_from(&source).await
    }

    /// Mirror any content source into the local root and republish.
    ///
    /// Nothing is published until the whole pull succeeds, so a failed
    /// cycle leaves the previous snapshot up.
    pub(crate) async fn mirror_from<S: ContentSource>(&self, source: &S) -> Result<()> {
        let root = self.state.content_root();

        let profiles = source.fetch_profiles().await?;

        let progress = ProgressTracker::new();
        let stats = sync_once(source, root, &SyncPolicy::mirror(), &progress).await?;
        info!(
            origin = %source.name(),
            fetched = stats.files_fetched,
            deleted = stats.files_deleted,
            "replica reconciled"
        );

        let tree = TreeBuilder::new().build(root).await?;
        self.state.publish(tree, profiles).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use packmirror_common::{Error, Profile, ProfileVersion, TreePath};
    use packmirror_sync::{ByteStream, MemorySource};
    use packmirror_tree::TreeNode;
    use tempfile::TempDir;

    /// Origin that refuses every request.
    struct DownOrigin;

    #[async_trait]
    impl ContentSource for DownOrigin {
        fn name(&self) -> &str {
            "down"
        }

        async fn fetch_tree(&self) -> Result<TreeNode> {
            Err(Error::Network("connection refused".to_string()))
        }

        async fn fetch_profiles(&self) -> Result<Vec<Profile>> {
            Err(Error::Network("connection refused".to_string()))
        }

        async fn file_count(&self, _game_folder: &str) -> Result<u64> {
            Err(Error::Network("connection refused".to_string()))
        }

        async fn fetch_file(&self, _path: &TreePath) -> Result<ByteStream> {
            Err(Error::Network("connection refused".to_string()))
        }
    }

    fn replica(state: Arc<ServerState>) -> Coordinator {
        Coordinator::new(
            state,
            Role::Replica {
                origin_url: "http://origin:8080".to_string(),
            },
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn test_origin_cycle_publishes_tree_and_profiles() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("content");
        tokio::fs::create_dir_all(root.join("gameFolders/skyblock"))
            .await
            .unwrap();
        tokio::fs::write(root.join("gameFolders/skyblock/options.txt"), b"fov:90")
            .await
            .unwrap();

        let profiles_file = temp.path().join("profiles.json");
        tokio::fs::write(
            &profiles_file,
            r#"[{"name":"skyblock","version":{"mc":"1.20.1"},"gameFolder":"skyblock"}]"#,
        )
        .await
        .unwrap();

        let (state, _rx) = ServerState::new(root.clone(), "test".to_string());
        let coordinator = Coordinator::new(
            state.clone(),
            Role::Origin { profiles_file },
            Duration::from_secs(3600),
        );

        coordinator.cycle().await.unwrap();

        let published = state.snapshot().await;
        assert_eq!(published.profiles.len(), 1);
        assert!(published.rebuilt_at.is_some());
        // options.txt plus the rebuilt tarball
        assert_eq!(published.tree.count_files(), 2);
        assert!(root.join("tarballs/skyblock.tar.gz").exists());
    }

    #[tokio::test]
    async fn test_failed_cycle_keeps_previous_state() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("content");
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("a.txt"), b"a").await.unwrap();

        let profiles_file = temp.path().join("profiles.json");
        let (state, _rx) = ServerState::new(root.clone(), "test".to_string());
        let coordinator = Coordinator::new(
            state.clone(),
            Role::Origin {
                profiles_file: profiles_file.clone(),
            },
            Duration::from_secs(3600),
        );

        coordinator.cycle().await.unwrap();
        let good = state.snapshot().await;
        assert_eq!(good.tree.count_files(), 1);

        tokio::fs::write(&profiles_file, "{broken").await.unwrap();
        assert!(coordinator.cycle().await.is_err());

        let after = state.snapshot().await;
        assert_eq!(after.tree, good.tree);
    }

    #[tokio::test]
    async fn test_reload_trigger_runs_cycle() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("content");
        tokio::fs::create_dir_all(&root).await.unwrap();
        tokio::fs::write(root.join("a.txt"), b"a").await.unwrap();

        let (state, reload_rx) = ServerState::new(root, "test".to_string());
        let coordinator = Coordinator::new(
            state.clone(),
            Role::Origin {
                profiles_file: temp.path().join("profiles.json"),
            },
            Duration::from_secs(3600),
        );

        let handle = tokio::spawn(coordinator.run(reload_rx));

        state.request_reload().await.unwrap();

        // Poll until the startup or reload cycle has published.
        for _ in 0..50 {
            if state.snapshot().await.rebuilt_at.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        assert!(state.snapshot().await.rebuilt_at.is_some());
        assert_eq!(state.snapshot().await.tree.count_files(), 1);
        handle.abort();
    }

    #[tokio::test]
    async fn test_replica_cycle_mirrors_origin_and_republishes() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("content");

        let origin = MemorySource::new();
        origin.put_file("gameFolders/vanilla/options.txt", b"fov:90".to_vec());
        origin.put_file("java/linux-17.tar.gz", b"jre".to_vec());
        origin.set_profiles(vec![Profile {
            name: "vanilla".to_string(),
            version: ProfileVersion {
                mc: "1.21".to_string(),
                forge: None,
            },
            game_folder: Some("vanilla".to_string()),
        }]);

        let (state, _rx) = ServerState::new(root.clone(), "test".to_string());
        let coordinator = replica(state.clone());

        coordinator.mirror_from(&origin).await.unwrap();

        // Content pulled to disk and republished with the origin's profiles.
        assert_eq!(
            tokio::fs::read(root.join("gameFolders/vanilla/options.txt"))
                .await
                .unwrap(),
            b"fov:90"
        );
        let published = state.snapshot().await;
        assert_eq!(published.tree, origin.fetch_tree().await.unwrap());
        assert_eq!(published.profiles.len(), 1);
        assert_eq!(published.profiles[0].name, "vanilla");
    }

    #[tokio::test]
    async fn test_failed_replica_cycle_keeps_previous_state() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("content");

        let origin = MemorySource::new();
        origin.put_file("a.txt", b"a".to_vec());

        let (state, _rx) = ServerState::new(root, "test".to_string());
        let coordinator = replica(state.clone());

        coordinator.mirror_from(&origin).await.unwrap();
        let good = state.snapshot().await;
        assert_eq!(good.tree.count_files(), 1);

        assert!(coordinator.mirror_from(&DownOrigin).await.is_err());

        let after = state.snapshot().await;
        assert_eq!(after.tree, good.tree);
        assert_eq!(after.rebuilt_at, good.rebuilt_at);
    }
}
