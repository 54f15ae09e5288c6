//! Server configuration.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::coordinator::Role;

/// Default rebuild/replication interval in seconds (hourly).
const DEFAULT_INTERVAL_SECS: u64 = 3600;

/// Configuration for one server process.
///
/// The role is chosen once at process start: the presence of an origin
/// address makes the process a replica, otherwise it is an origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP surface binds to.
    pub bind: SocketAddr,
    /// Root of the distributed content directory.
    pub content_root: PathBuf,
    /// Address of the origin to mirror. `None` means this process is the
    /// origin.
    pub origin_url: Option<String>,
    /// Declarative profile list (origin role only). Defaults to
    /// `profiles.json` next to the content root.
    pub profiles_file: Option<PathBuf>,
    /// Seconds between rebuild/replication cycles.
    pub interval_secs: u64,
    /// Build version served by GET /version.
    pub version: String,
}

impl ServerConfig {
    /// Create a config with defaults for the optional knobs.
    pub fn new(bind: SocketAddr, content_root: PathBuf) -> Self {
        Self {
            bind,
            content_root,
            origin_url: None,
            profiles_file: None,
            interval_secs: DEFAULT_INTERVAL_SECS,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Mirror the given origin instead of acting as one.
    pub fn with_origin(mut self, origin_url: String) -> Self {
        self.origin_url = Some(origin_url);
        self
    }

    /// Use a specific profiles file.
    pub fn with_profiles_file(mut self, path: PathBuf) -> Self {
        self.profiles_file = Some(path);
        self
    }

    /// Use a specific cycle interval.
    pub fn with_interval_secs(mut self, secs: u64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// The replication role this process runs in.
    pub fn role(&self) -> Role {
        match &self.origin_url {
            Some(origin_url) => Role::Replica {
                origin_url: origin_url.clone(),
            },
            None => Role::Origin {
                profiles_file: self.profiles_file.clone().unwrap_or_else(|| {
                    self.content_root
                        .parent()
                        .unwrap_or(&self.content_root)
                        .join("profiles.json")
                }),
            },
        }
    }

    /// The cycle interval as a duration.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_follows_origin_presence() {
        let base = ServerConfig::new("127.0.0.1:8080".parse().unwrap(), "/srv/content".into());

        assert!(matches!(base.role(), Role::Origin { .. }));

        let replica = base.with_origin("http://master:8080".to_string());
        assert!(matches!(
            replica.role(),
            Role::Replica { origin_url } if origin_url == "http://master:8080"
        ));
    }

    #[test]
    fn test_default_profiles_file_sits_next_to_content_root() {
        let config = ServerConfig::new("127.0.0.1:8080".parse().unwrap(), "/srv/content".into());
        match config.role() {
            Role::Origin { profiles_file } => {
                assert_eq!(profiles_file, PathBuf::from("/srv/profiles.json"));
            }
            Role::Replica { .. } => panic!("expected origin role"),
        }
    }
}
