//! Text index error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TextIndexError {
    #[error("index missing: {0}")]
    IndexMissing(String),

    #[error("tantivy error: {0}")]
    Tantivy(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tantivy::TantivyError> for TextIndexError {
    fn from(e: tantivy::TantivyError) -> Self {
        TextIndexError::Tantivy(e.to_string())
    }
}
