//! Query error type.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    /// The repository has never been indexed; the message carries the exact
    /// command to run.
    #[error("{0}")]
    IndexMissing(String),

    #[error(transparent)]
    Store(#[from] symbol_store::StoreError),

    #[error(transparent)]
    Text(#[from] text_index::TextIndexError),

    #[error(transparent)]
    Layout(#[from] repo_layout::LayoutError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
