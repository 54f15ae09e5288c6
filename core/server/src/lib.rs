//! PackMirror distribution server.
//!
//! A server process runs in exactly one of two roles for its lifetime:
//! - **Origin**: treats its content directory as ground truth, rebuilds
//!   bundles and the published tree on a schedule and on demand.
//! - **Replica**: keeps its content directory in sync with one origin and
//!   republishes what it mirrored.
//!
//! Request handlers only read snapshots of the published state; the role
//! coordinator is the single writer.

pub mod bundle;
pub mod config;
pub mod coordinator;
pub mod profiles;
pub mod routes;
pub mod state;

use tokio::net::TcpListener;
use tracing::info;

use packmirror_common::{Error, Result};

pub use config::ServerConfig;
pub use coordinator::{Coordinator, Role};
pub use state::{Published, ServerState};

/// Run a server until the process is stopped.
///
/// Spawns the role coordinator, then serves the HTTP surface on the
/// configured bind address.
pub async fn run(config: ServerConfig) -> Result<()> {
    let role = config.role();
    let (state, reload_rx) = ServerState::new(
        config.content_root.clone(),
        config.version.clone(),
    );

    let coordinator = Coordinator::new(state.clone(), role, config.interval());
    tokio::spawn(coordinator.run(reload_rx));

    let app = routes::router(state);
    let listener = TcpListener::bind(config.bind).await?;
    info!(bind = %config.bind, "server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::Network(format!("server error: {}", e)))
}
