//! Dense-vector subsystem: chunkers, the embedding client and the two
//! interchangeable vector backends.
//!
//! - [`chunk`] turns extracted Go functions and markdown sections into
//!   hash-identified [`VectorChunk`]s.
//! - [`EmbeddingClient`] batches texts to the remote embedding endpoint.
//! - [`VectorBackend`] is a sealed Local/Remote pair behind one capability
//!   set; candidate-restricted search exists only on the Local variant and
//!   callers fall back by pattern match.

pub mod chunk;
mod backend;
mod embed;
mod errors;
mod local;
mod remote;
mod runtime;

pub use backend::VectorBackend;
pub use chunk::{ChunkKind, VectorChunk, chunk_go_functions, chunk_markdown_sections};
pub use embed::{EmbedConfig, Embedding, EmbeddingClient};
pub use errors::VectorError;
pub use local::LocalVectorStore;
pub use remote::RemoteVectorDb;
pub use runtime::{ScoredPoint, VectorPayload, VectorPoint, VectorRuntime};
