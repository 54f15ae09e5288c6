//! Common types used throughout PackMirror.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A path within a content tree, independent of the local filesystem.
///
/// Components never contain separators, so a `TreePath` can be mapped onto
/// a filesystem path or a URL without re-validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreePath {
    components: Vec<String>,
}

impl TreePath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Create a path from string components.
    ///
    /// # Errors
    /// - Returns error if any component is empty or contains a separator
    pub fn from_components(components: Vec<String>) -> crate::Result<Self> {
        for comp in &components {
            if comp.is_empty() {
                return Err(crate::Error::InvalidInput(
                    "Path component cannot be empty".to_string(),
                ));
            }
            if comp.contains('/') || comp.contains('\\') {
                return Err(crate::Error::InvalidInput(
                    "Path component cannot contain separators".to_string(),
                ));
            }
        }
        Ok(Self { components })
    }

    /// Parse a path string into a TreePath.
    ///
    /// Uses '/' as separator.
    pub fn parse(path: &str) -> crate::Result<Self> {
        if path.is_empty() || path == "/" {
            return Ok(Self::root());
        }

        let path = path.trim_start_matches('/').trim_end_matches('/');
        if path.is_empty() {
            return Ok(Self::root());
        }

        let components: Vec<String> = path.split('/').map(String::from).collect();
        Self::from_components(components)
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the file/directory name (last component).
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Get the first component, if any.
    ///
    /// The deletion skip-list matches against this segment.
    pub fn first(&self) -> Option<&str> {
        self.components.first().map(|s| s.as_str())
    }

    /// Join this path with a child component.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        if child.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Child component cannot be empty".to_string(),
            ));
        }
        if child.contains('/') || child.contains('\\') {
            return Err(crate::Error::InvalidInput(
                "Child component cannot contain separators".to_string(),
            ));
        }
        let mut components = self.components.clone();
        components.push(child.to_string());
        Ok(Self { components })
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Resolve this path under a filesystem root.
    pub fn to_fs_path(&self, root: impl AsRef<std::path::Path>) -> std::path::PathBuf {
        let mut fs_path = root.as_ref().to_path_buf();
        for component in &self.components {
            fs_path.push(component);
        }
        fs_path
    }

    /// Convert to a string representation.
    pub fn to_string_path(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}

/// Game and loader versions for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileVersion {
    /// Minecraft version.
    pub mc: String,
    /// Forge version, if the profile is modded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forge: Option<String>,
}

/// A distributable profile published by an origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    /// Profile name.
    pub name: String,
    /// Game and loader versions.
    pub version: ProfileVersion,
    /// Name of the game folder subtree this profile is bound to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_folder: Option<String>,
}

/// Per-file listing entry provided by the management backend.
///
/// This is the only shape the sync engine needs from that collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Path relative to the content root.
    pub filepath: String,
    /// Content digest.
    pub hash: String,
    /// Last modification timestamp (RFC 3339).
    pub last_modified: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_path_root() {
        let path = TreePath::root();
        assert!(path.is_root());
        assert_eq!(path.to_string_path(), "/");
    }

    #[test]
    fn test_tree_path_parse() {
        let path = TreePath::parse("/gameFolders/vanilla/options.txt").unwrap();
        assert_eq!(path.components(), &["gameFolders", "vanilla", "options.txt"]);
        assert_eq!(path.first(), Some("gameFolders"));
        assert_eq!(path.name(), Some("options.txt"));
    }

    #[test]
    fn test_tree_path_join() {
        let path = TreePath::root().join("mods").unwrap().join("a.jar").unwrap();
        assert_eq!(path.to_string_path(), "/mods/a.jar");
    }

    #[test]
    fn test_tree_path_rejects_separators() {
        assert!(TreePath::root().join("a/b").is_err());
        assert!(TreePath::from_components(vec!["ok".into(), "".into()]).is_err());
    }

    #[test]
    fn test_tree_path_parent() {
        let path = TreePath::parse("/mods/a.jar").unwrap();
        assert_eq!(path.parent().unwrap().to_string_path(), "/mods");
        assert!(TreePath::root().parent().is_none());
    }

    #[test]
    fn test_tree_path_to_fs_path() {
        let path = TreePath::parse("/mods/a.jar").unwrap();
        let fs = path.to_fs_path("/srv/content");
        assert_eq!(fs, std::path::PathBuf::from("/srv/content/mods/a.jar"));
    }

    #[test]
    fn test_profile_wire_shape() {
        let json = r#"{"name":"skyblock","version":{"mc":"1.20.1","forge":"47.2.0"},"gameFolder":"skyblock"}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert_eq!(profile.name, "skyblock");
        assert_eq!(profile.version.forge.as_deref(), Some("47.2.0"));
        assert_eq!(profile.game_folder.as_deref(), Some("skyblock"));

        let back = serde_json::to_string(&profile).unwrap();
        assert!(back.contains("\"gameFolder\":\"skyblock\""));
    }

    #[test]
    fn test_profile_without_forge() {
        let json = r#"{"name":"vanilla","version":{"mc":"1.21"}}"#;
        let profile: Profile = serde_json::from_str(json).unwrap();
        assert!(profile.version.forge.is_none());
        assert!(profile.game_folder.is_none());
    }
}
