//! Directory tree snapshotting.

use std::collections::BTreeMap;
use std::path::Path;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::fs;
use tracing::trace;

use packmirror_common::{Error, Result};

use crate::digest::hash_file;
use crate::node::TreeNode;

/// How file leaves are fingerprinted while building a tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestMode {
    /// Hash every file's bytes.
    Content,
    /// Record an empty-string placeholder per file.
    ///
    /// Callers that only need the file/folder shape of a tree use this to
    /// skip hashing entirely.
    ShapeOnly,
}

/// Builds a tree snapshot from a directory on disk.
///
/// The traversal is read-only. Symlinked directories are rejected rather
/// than followed, so a link cycle can never recurse; symlinked files are
/// hashed through to the target's bytes.
pub struct TreeBuilder {
    mode: DigestMode,
}

impl TreeBuilder {
    /// Create a builder that hashes file content.
    pub fn new() -> Self {
        Self {
            mode: DigestMode::Content,
        }
    }

    /// Create a builder that records shape only.
    pub fn shape_only() -> Self {
        Self {
            mode: DigestMode::ShapeOnly,
        }
    }

    /// Snapshot the given path.
    ///
    /// A file yields a single leaf; a directory yields a branch with one
    /// entry per child, recursing into subdirectories.
    ///
    /// # Errors
    /// - `Error::Io` if the path cannot be read
    /// - `Error::InvalidInput` for symlinked directories or non-UTF-8 names
    pub async fn build(&self, root: impl AsRef<Path>) -> Result<TreeNode> {
        self.build_path(root.as_ref()).await
    }

    fn build_path<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<TreeNode>> {
        async move {
            let meta = fs::symlink_metadata(path).await?;

            if meta.is_symlink() {
                let target = fs::metadata(path).await?;
                if target.is_dir() {
                    return Err(Error::InvalidInput(format!(
                        "symlinked directory not allowed: {}",
                        path.display()
                    )));
                }
                return self.leaf(path).await;
            }

            if meta.is_file() {
                return self.leaf(path).await;
            }

            let mut children = BTreeMap::new();
            let mut entries = fs::read_dir(path).await?;

            while let Some(entry) = entries.next_entry().await? {
                let name = entry
                    .file_name()
                    .into_string()
                    .map_err(|n| {
                        Error::InvalidInput(format!("non-UTF-8 entry name: {:?}", n))
                    })?;

                let child = self.build_path(&entry.path()).await?;
                children.insert(name, child);
            }

            trace!(path = %path.display(), entries = children.len(), "snapshotted directory");
            Ok(TreeNode::Branch(children))
        }
        .boxed()
    }

    async fn leaf(&self, path: &Path) -> Result<TreeNode> {
        let digest = match self.mode {
            DigestMode::Content => hash_file(path).await?,
            DigestMode::ShapeOnly => String::new(),
        };
        Ok(TreeNode::Leaf(digest))
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::hash_bytes;
    use tempfile::TempDir;

    async fn write(dir: &Path, rel: &str, content: &[u8]) {
        let path = dir.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.unwrap();
        }
        fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn test_build_nested_tree() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "mods/a.jar", b"jar-a").await;
        write(temp.path(), "mods/b.jar", b"jar-b").await;
        write(temp.path(), "options.txt", b"opts").await;
        fs::create_dir(temp.path().join("empty")).await.unwrap();

        let tree = TreeBuilder::new().build(temp.path()).await.unwrap();

        assert_eq!(tree.count_files(), 3);
        assert_eq!(
            tree.get("mods").unwrap().get("a.jar").unwrap().digest(),
            Some(hash_bytes(b"jar-a").as_str())
        );
        assert_eq!(
            tree.get("options.txt").unwrap().digest(),
            Some(hash_bytes(b"opts").as_str())
        );
        // Empty directories survive as empty branches.
        let empty = tree.get("empty").unwrap();
        assert!(empty.is_branch());
        assert_eq!(empty.count_files(), 0);
    }

    #[tokio::test]
    async fn test_build_single_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "one.txt", b"one").await;

        let tree = TreeBuilder::new()
            .build(temp.path().join("one.txt"))
            .await
            .unwrap();
        assert_eq!(tree.digest(), Some(hash_bytes(b"one").as_str()));
    }

    #[tokio::test]
    async fn test_shape_only_mode() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "sub/file.bin", b"bytes").await;

        let tree = TreeBuilder::shape_only().build(temp.path()).await.unwrap();
        assert_eq!(
            tree.get("sub").unwrap().get("file.bin").unwrap().digest(),
            Some("")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_directory_rejected() {
        let temp = TempDir::new().unwrap();
        let real = temp.path().join("real");
        fs::create_dir(&real).await.unwrap();
        write(temp.path(), "real/f.txt", b"f").await;
        tokio::fs::symlink(&real, temp.path().join("link"))
            .await
            .unwrap();

        let err = TreeBuilder::new().build(temp.path()).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlinked_file_hashes_target() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "real.txt", b"payload").await;
        tokio::fs::symlink(temp.path().join("real.txt"), temp.path().join("link.txt"))
            .await
            .unwrap();

        let tree = TreeBuilder::new().build(temp.path()).await.unwrap();
        assert_eq!(
            tree.get("link.txt").unwrap().digest(),
            Some(hash_bytes(b"payload").as_str())
        );
    }
}
