//! Recursive tree model exchanged between peers.
//!
//! A tree maps entry names to either a leaf (file digest) or a nested
//! subtree. On the wire it is a nested JSON object: a string value is a
//! leaf digest, an object value is a subtree. No timestamps, no sizes.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use packmirror_common::{Error, Result, TreePath};

/// A node in a content tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// A file, carrying its content digest.
    Leaf(String),
    /// A directory, mapping entry names to child nodes.
    Branch(BTreeMap<String, TreeNode>),
}

impl TreeNode {
    /// Create an empty directory node.
    pub fn empty_branch() -> Self {
        TreeNode::Branch(BTreeMap::new())
    }

    /// Check if this is a file node.
    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf(_))
    }

    /// Check if this is a directory node.
    pub fn is_branch(&self) -> bool {
        matches!(self, TreeNode::Branch(_))
    }

    /// Get the content digest, if this is a leaf.
    pub fn digest(&self) -> Option<&str> {
        match self {
            TreeNode::Leaf(digest) => Some(digest),
            TreeNode::Branch(_) => None,
        }
    }

    /// Get the children map, if this is a branch.
    pub fn children(&self) -> Option<&BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Branch(children) => Some(children),
            TreeNode::Leaf(_) => None,
        }
    }

    /// Get the mutable children map, if this is a branch.
    pub fn children_mut(&mut self) -> Option<&mut BTreeMap<String, TreeNode>> {
        match self {
            TreeNode::Branch(children) => Some(children),
            TreeNode::Leaf(_) => None,
        }
    }

    /// Get a child by name, if this is a branch.
    pub fn get(&self, name: &str) -> Option<&TreeNode> {
        self.children().and_then(|c| c.get(name))
    }

    /// Navigate to a descendant node by path.
    pub fn descend(&self, path: &TreePath) -> Option<&TreeNode> {
        let mut current = self;
        for component in path.components() {
            current = current.get(component)?;
        }
        Some(current)
    }

    /// Count the files in this subtree.
    pub fn count_files(&self) -> u64 {
        match self {
            TreeNode::Leaf(_) => 1,
            TreeNode::Branch(children) => children.values().map(TreeNode::count_files).sum(),
        }
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Protocol(e.to_string()))
    }

    /// Deserialize from the JSON wire format.
    ///
    /// # Errors
    /// - `Error::Protocol` if the JSON is malformed or not a tree shape
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Protocol(format!("malformed tree: {}", e)))
    }
}
