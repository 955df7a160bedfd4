//! Public query types: options, hits and mode-specific stats.

use crate::mode::QueryMode;
use serde::{Deserialize, Serialize};

/// Which retrieval sources participate (`--type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Text,
    Symbol,
    Mixed,
    Vector,
}

impl Default for QueryType {
    fn default() -> Self {
        QueryType::Mixed
    }
}

/// Query invocation options.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub mode: QueryMode,
    /// Explicit `--type`. `None` leaves the blending to the detected mode;
    /// `Some(Mixed)` forces the mixed pipeline even for context-ish queries.
    pub qtype: Option<QueryType>,
    /// Non-positive falls back to the configured top-k (default 10).
    pub top_k: i64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            mode: QueryMode::Auto,
            qtype: None,
            top_k: 0,
        }
    }
}

/// Relations grouped per kind, at most five edges each.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationGroup {
    pub kind: String,
    pub edges: Vec<String>,
}

/// A doc link attached to a hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocLinkRef {
    pub symbol: String,
    pub file: String,
    pub line: u32,
}

/// One ranked result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub kind: String,
    /// `symbol`, `text`, `vector`, `file` or a `+`-joined combination.
    pub source: String,
    pub name: String,
    pub file: String,
    pub line: u32,
    pub line_end: u32,
    pub score: f32,
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub doc_links: Vec<DocLinkRef>,
}

/// `architecture` mode output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureStats {
    pub imports: i64,
    pub depends_on: i64,
    pub top_pairs: Vec<(String, String, i64)>,
}

/// `quality` mode output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityStats {
    pub symbols: i64,
    pub relations: i64,
    pub doc_links: i64,
    pub text_docs: i64,
}

/// Everything a query run produces; rendering happens separately.
#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub query: String,
    pub mode: QueryMode,
    pub hits: Vec<SearchHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture: Option<ArchitectureStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityStats>,
}
