//! Extraction error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("grammar error: {0}")]
    Grammar(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
