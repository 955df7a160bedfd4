//! Vector subsystem error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("config error: {0}")]
    Config(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("vector store error: {0}")]
    Store(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("vector size mismatch: got={got}, want={want}")]
    SizeMismatch { got: usize, want: usize },
}
