//! Declarative profile list loaded by the origin role.

use std::path::Path;

use tokio::fs;
use tracing::warn;

use packmirror_common::{Error, Profile, Result};

/// Load the profile list from a JSON file.
///
/// A missing file is treated as an empty list so a fresh origin can start
/// before any profiles are declared. A malformed file is an error; the
/// coordinator keeps the previously published list in that case.
pub async fn load(path: &Path) -> Result<Vec<Profile>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "profiles file missing, publishing empty list");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    serde_json::from_str(&raw).map_err(|e| {
        Error::InvalidInput(format!(
            "malformed profiles file {}: {}",
            path.display(),
            e
        ))
    })
}
