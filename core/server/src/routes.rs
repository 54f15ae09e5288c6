//! HTTP surface exposed by origin and replica servers.
//!
//! Read-only except POST /reload. Handlers never mutate published state;
//! they read snapshots owned by the coordinator.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::debug;

use packmirror_common::{Error, Profile, TreePath};
use packmirror_sync::FileCount;
use packmirror_tree::TreeNode;

use crate::state::ServerState;

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Handler-level error mapped onto HTTP statuses.
#[derive(Debug)]
struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = ErrorResponse {
            error: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Create the router with all endpoints.
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/hashes", get(hashes))
        .route("/profiles", get(profiles))
        .route("/fileCount/{gameFolder}", get(file_count))
        .route("/static/{*path}", get(static_file))
        .route("/version", get(version))
        .route("/reload", post(reload))
        .with_state(state)
}

/// Liveness probe.
async fn alive() -> StatusCode {
    StatusCode::OK
}

/// Current published fingerprint tree.
async fn hashes(State(state): State<Arc<ServerState>>) -> Json<TreeNode> {
    Json(state.snapshot().await.tree)
}

/// Distributable profile metadata.
async fn profiles(State(state): State<Arc<ServerState>>) -> Json<Vec<Profile>> {
    Json(state.snapshot().await.profiles)
}

/// Total file count under a named game folder.
async fn file_count(
    State(state): State<Arc<ServerState>>,
    Path(game_folder): Path<String>,
) -> Result<Json<FileCount>, ApiError> {
    let snapshot = state.snapshot().await;
    let path = TreePath::root()
        .join("gameFolders")
        .and_then(|p| p.join(&game_folder))?;

    let subtree = snapshot
        .tree
        .descend(&path)
        .ok_or_else(|| Error::NotFound(format!("no such game folder: {}", game_folder)))?;

    Ok(Json(FileCount {
        count: subtree.count_files(),
    }))
}

/// Raw bytes of one file in the published tree.
async fn static_file(
    State(state): State<Arc<ServerState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let tree_path = sanitize(&path)?;
    let fs_path = tree_path.to_fs_path(state.content_root());

    let file = tokio::fs::File::open(&fs_path)
        .await
        .map_err(|_| Error::NotFound(format!("no such file: {}", tree_path)))?;

    let meta = file.metadata().await.map_err(Error::Io)?;
    if !meta.is_file() {
        return Err(Error::NotFound(format!("not a file: {}", tree_path)).into());
    }

    debug!(path = %tree_path, size = meta.len(), "serving static file");

    let body = Body::from_stream(ReaderStream::new(file));
    let response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_LENGTH, meta.len())
        .body(body)
        .map_err(|e| Error::InvalidInput(e.to_string()))?;

    Ok(response)
}

/// Server build version.
async fn version(State(state): State<Arc<ServerState>>) -> String {
    state.version().to_string()
}

/// Force an out-of-band rebuild/reconcile cycle.
async fn reload(State(state): State<Arc<ServerState>>) -> Result<StatusCode, ApiError> {
    state.request_reload().await?;
    Ok(StatusCode::OK)
}

/// Resolve a request path strictly under the content root.
fn sanitize(raw: &str) -> Result<TreePath, Error> {
    let path = TreePath::parse(raw)?;

    if path.is_root() {
        return Err(Error::InvalidInput("empty static path".to_string()));
    }
    if path
        .components()
        .iter()
        .any(|c| c == "." || c == ".." || c.contains('\0'))
    {
        return Err(Error::InvalidInput(format!(
            "path escapes content root: {}",
            raw
        )));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_state(root: &std::path::Path) -> Arc<ServerState> {
        let (state, _rx) = ServerState::new(root.to_path_buf(), "1.2.3-test".to_string());
        state
    }

    #[test]
    fn test_sanitize_rejects_traversal() {
        assert!(sanitize("../etc/passwd").is_err());
        assert!(sanitize("a/../../b").is_err());
        assert!(sanitize("a/./b").is_err());
        assert!(sanitize("").is_err());
        assert!(sanitize("gameFolders/vanilla/options.txt").is_ok());
    }

    #[tokio::test]
    async fn test_file_count_for_published_tree() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        let tree = TreeNode::from_json(
            r#"{"gameFolders": {"vanilla": {"a.txt": "1", "mods": {"b.jar": "2"}}}}"#,
        )
        .unwrap();
        state.publish(tree, Vec::new()).await;

        let Json(count) = file_count(State(state.clone()), Path("vanilla".to_string()))
            .await
            .unwrap();
        assert_eq!(count.count, 2);

        let missing = file_count(State(state), Path("nope".to_string())).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_version_and_hashes_snapshot() {
        let temp = TempDir::new().unwrap();
        let state = test_state(temp.path());

        assert_eq!(version(State(state.clone())).await, "1.2.3-test");

        let tree = TreeNode::from_json(r#"{"x":"1"}"#).unwrap();
        state.publish(tree.clone(), Vec::new()).await;

        let Json(served) = hashes(State(state)).await;
        assert_eq!(served, tree);
    }

    #[tokio::test]
    async fn test_static_file_served_from_content_root() {
        let temp = TempDir::new().unwrap();
        tokio::fs::create_dir_all(temp.path().join("java"))
            .await
            .unwrap();
        tokio::fs::write(temp.path().join("java/jre.tar.gz"), b"bytes")
            .await
            .unwrap();

        let state = test_state(temp.path());
        let response = static_file(State(state.clone()), Path("java/jre.tar.gz".to_string()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let missing = static_file(State(state), Path("java/absent".to_string())).await;
        assert!(missing.is_err());
    }
}
