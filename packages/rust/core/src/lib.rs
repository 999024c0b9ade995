//! Shelf sync orchestration for Bookshelf.
//!
//! This crate drives the paginated feed from `bookshelf-feed` page by page,
//! turns each entry into a [`ContentNode`](bookshelf_shared::ContentNode) and
//! hands it to a [`NodeSink`] (e.g., `sync_shelf`).

pub mod node;
pub mod pipeline;
pub mod sink;

pub use node::{Fingerprinter, build_node};
pub use pipeline::{ProgressReporter, SilentProgress, SyncConfig, SyncResult, sync_shelf};
pub use sink::{DirectorySink, MemorySink, NodeSink};
