//! Full-text inverted index over source and markdown documents.
//!
//! Thin facade over tantivy: a fixed schema, create/open lifecycle, id-keyed
//! deletes and a weighted multi-field disjunction query. Snippet extraction
//! reads line ranges straight from the work tree.

mod errors;
mod index;
mod snippet;

pub use errors::TextIndexError;
pub use index::{TextDocInput, TextHit, TextIndex};
pub use snippet::{find_query_window, read_line_range};
