//! Per-repository layout, metadata and application configuration.
//!
//! This crate owns the on-disk contract under the user base directory
//! (`~/.bcindex` by default):
//! - Stable repository ids (SHA-1 of the absolute root path)
//! - The per-repo directory tree (text/symbol/vector/meta areas)
//! - The small JSON meta record with index timestamps
//! - The YAML application configuration and its defaults

mod config;
mod errors;
mod meta;
mod paths;

pub use config::{AppConfig, IndexConfig, QueryConfig, Tier, default_config_yaml, parse_duration};
pub use errors::LayoutError;
pub use meta::RepoMeta;
pub use paths::{RepoPaths, repo_id_for_root, resolve_base_dir};
