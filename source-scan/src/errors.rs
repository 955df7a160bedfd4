//! Discovery and VCS error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(String),

    #[error("filter error: {0}")]
    Filter(String),
}
