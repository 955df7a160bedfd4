//! Pipeline error type. Anything surfacing here aborts the run; per-file
//! problems go through the [`crate::ErrorCollector`] instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Layout(#[from] repo_layout::LayoutError),

    #[error(transparent)]
    Scan(#[from] source_scan::ScanError),

    #[error(transparent)]
    Store(#[from] symbol_store::StoreError),

    #[error(transparent)]
    Text(#[from] text_index::TextIndexError),

    #[error(transparent)]
    Vector(#[from] vector_store::VectorError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("fatal: {0}")]
    Fatal(String),
}
