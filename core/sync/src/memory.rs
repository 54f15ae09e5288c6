//! In-memory content source for testing.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;

use packmirror_common::{Error, Profile, Result, TreePath};
use packmirror_tree::{hash_bytes, TreeNode};

use crate::source::{ByteStream, ContentSource};

/// In-memory origin.
///
/// Holds files keyed by their tree path and derives the published tree
/// from them on demand. Clones share the same backing store. All data is
/// lost when the last clone drops.
#[derive(Clone)]
pub struct MemorySource {
    files: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
    profiles: Arc<RwLock<Vec<Profile>>>,
}

impl MemorySource {
    /// Create a new empty source.
    pub fn new() -> Self {
        Self {
            files: Arc::new(RwLock::new(BTreeMap::new())),
            profiles: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Insert or replace a file at a slash-separated path.
    pub fn put_file(&self, path: &str, data: impl Into<Vec<u8>>) {
        self.files
            .write()
            .unwrap()
            .insert(path.trim_matches('/').to_string(), data.into());
    }

    /// Remove a file.
    pub fn remove_file(&self, path: &str) {
        self.files.write().unwrap().remove(path.trim_matches('/'));
    }

    /// Replace the published profile list.
    pub fn set_profiles(&self, profiles: Vec<Profile>) {
        *self.profiles.write().unwrap() = profiles;
    }

    fn build_tree(&self) -> TreeNode {
        let files = self.files.read().unwrap();
        let mut root = TreeNode::empty_branch();

        for (path, data) in files.iter() {
            let mut node = &mut root;
            let components: Vec<&str> = path.split('/').collect();
            let (leaf_name, dirs) = components.split_last().unwrap();

            for dir in dirs {
                let children = node.children_mut().unwrap();
                node = children
                    .entry((*dir).to_string())
                    .or_insert_with(TreeNode::empty_branch);
            }

            node.children_mut()
                .unwrap()
                .insert((*leaf_name).to_string(), TreeNode::Leaf(hash_bytes(data)));
        }

        root
    }
}

impl Default for MemorySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    async fn fetch_tree(&self) -> Result<TreeNode> {
        Ok(self.build_tree())
    }

    async fn fetch_profiles(&self) -> Result<Vec<Profile>> {
        Ok(self.profiles.read().unwrap().clone())
    }

    async fn file_count(&self, game_folder: &str) -> Result<u64> {
        let prefix = format!("gameFolders/{}/", game_folder);
        let files = self.files.read().unwrap();
        Ok(files.keys().filter(|k| k.starts_with(&prefix)).count() as u64)
    }

    async fn fetch_file(&self, path: &TreePath) -> Result<ByteStream> {
        let key = path.components().join("/");
        let data = {
            let files = self.files.read().unwrap();
            files
                .get(&key)
                .cloned()
                .ok_or_else(|| Error::NotFound(format!("no such file: {}", path)))?
        };

        let stream = stream::once(async move { Ok(Bytes::from(data)) });
        Ok(Box::pin(stream))
    }
}
