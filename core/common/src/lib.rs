//! Common utilities and types shared across PackMirror modules.
//!
//! This module provides foundational types that are used throughout the
//! codebase, ensuring consistency and type safety.

pub mod error;
pub mod types;

pub use error::{Error, OriginFailure, Result};
pub use types::{FileEntry, Profile, ProfileVersion, TreePath};
