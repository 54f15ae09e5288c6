//! PackMirror synchronization engine.
//!
//! This module provides:
//! - The `ContentSource` seam over remote origins (HTTP and in-memory)
//! - Streamed single-file fetching into the local content directory
//! - The recursive tree reconciler that drives a local copy to match a
//!   remote tree
//! - Per-run progress accounting observable by callers
//! - Ordered failover across multiple origins

pub mod failover;
pub mod fetcher;
pub mod http;
pub mod memory;
pub mod policy;
pub mod progress;
pub mod reconciler;
pub mod source;

pub use failover::{sync_once, sync_with_failover, SyncOutcome};
pub use fetcher::fetch_file;
pub use http::HttpOrigin;
pub use memory::MemorySource;
pub use policy::{SyncPolicy, SyncScope};
pub use progress::ProgressTracker;
pub use reconciler::{ReconcileStats, Reconciler};
pub use source::{ByteStream, ContentSource, FileCount};
