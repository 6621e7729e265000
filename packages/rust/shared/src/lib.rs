//! Shared types, error model, and configuration for TalkMeta.
//!
//! This crate is the foundation depended on by all other TalkMeta crates.
//! It provides:
//! - [`TalkMetaError`]: the unified error type
//! - Domain types ([`Talk`], [`Catalog`], [`ColumnSpec`], [`StageId`])
//! - Configuration ([`AppConfig`], [`FetchOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, FetchConfig, FetchOptions, RunConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from,
};
pub use error::{Result, TalkMetaError};
pub use types::{CURRENT_SCHEMA_VERSION, Catalog, ColumnSpec, DataType, StageId, Talk};
