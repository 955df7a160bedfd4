//! Error types for layout, metadata and configuration handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("meta parse error: {0}")]
    Meta(String),

    #[error("repository root not found: {0}")]
    RootNotFound(String),
}
