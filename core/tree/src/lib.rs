//! Content fingerprinting for PackMirror.
//!
//! This module provides:
//! - Streamed per-file content digests
//! - The recursive tree model exchanged between peers
//! - A builder that snapshots a directory into a tree

pub mod builder;
pub mod digest;
pub mod node;

pub use builder::{DigestMode, TreeBuilder};
pub use digest::{hash_bytes, hash_file};
pub use node::TreeNode;
