//! Embedded relational store for symbols, relations, doc links, file entries
//! and the text/vector document registries.
//!
//! One SQLite database per repository (`symbol/symbols.db`). Writes are
//! append-only row inserts plus per-file cascade deletes; a full rebuild
//! resets the schema wholesale.

mod errors;
mod store;

pub use errors::StoreError;
pub use store::{FileEntry, RelationPair, SymbolStore};
