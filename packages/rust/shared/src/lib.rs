//! Shared types, error model, and configuration for Bookshelf.
//!
//! This crate is the foundation depended on by all other Bookshelf crates.
//! It provides:
//! - [`BookshelfError`]: the unified error type
//! - Domain records ([`Review`], [`Book`], [`Author`], [`ContentNode`], [`NodeKind`])
//! - Configuration ([`AppConfig`], [`SyncSettings`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GoodreadsConfig, OutputConfig, SyncSettings, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_api_key,
};
pub use error::{BookshelfError, ErrorKind, Result};
pub use types::{Author, Book, ContentNode, FingerprintMode, NodeKind, Review};
