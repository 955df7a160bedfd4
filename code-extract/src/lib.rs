//! Source extractors: Go symbols/imports via tree-sitter, markdown heading
//! chunks, and backtick doc links.
//!
//! The extractors are pure: bytes in, structured records out. Store writes,
//! text-index writes and vector jobs are wired elsewhere.

mod doclinks;
mod errors;
mod go;
mod markdown;
pub mod types;

pub use doclinks::extract_doc_links;
pub use errors::ExtractError;
pub use go::{GoExtractor, GoFileIndex, GoFunction};
pub use markdown::{MarkdownChunk, chunk_markdown};
pub use types::{
    DocLink, Relation, RelationKind, RelationSource, Symbol, SymbolKind,
};
