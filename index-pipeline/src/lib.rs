//! Indexing orchestration: full rebuild, file-scoped delta, the bounded
//! embedding worker pool and the polling watcher.

mod collector;
mod errors;
mod pipeline;
mod pkglist;
mod progress;
mod watcher;

pub use collector::{ErrorCollector, IndexWarning};
pub use errors::PipelineError;
pub use pipeline::{Indexer, open_vector_runtime};
pub use progress::{NoopProgress, Progress};
pub use watcher::Watcher;
