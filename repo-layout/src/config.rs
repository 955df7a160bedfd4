//! YAML application configuration (`config/bcindex.yaml`).
//!
//! All keys are optional in the file; missing keys take the documented
//! defaults so a partially written config keeps working.

use crate::errors::LayoutError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Index-time tier. `Balanced` and `Full` enable the package-list
/// dependency pass; `Fast` skips it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Fast,
    Balanced,
    Full,
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Balanced
    }
}

/// `index:` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub tier: Tier,
    pub exclude_dirs: Vec<String>,
    pub exclude: Vec<String>,
    pub use_gitignore: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            tier: Tier::default(),
            exclude_dirs: [".git", "vendor", "node_modules", ".venv", "venv", "__pycache__"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            exclude: ["*.min.js", "*.min.css", "*.pb.go", "*.gen.go"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            use_gitignore: true,
        }
    }
}

/// `query:` section.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub max_context_chars: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_context_chars: 20_000,
        }
    }
}

/// Full application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub index: IndexConfig,
    pub query: QueryConfig,

    pub qdrant_url: String,
    /// Empty string selects the remote backend.
    pub qdrant_path: String,
    pub qdrant_collection: String,
    pub qdrant_http_port: u16,
    pub qdrant_auto_start: bool,

    pub volces_endpoint: String,
    pub volces_api_key: String,
    pub volces_model: String,
    pub volces_dimensions: usize,
    pub volces_encoding: String,
    /// Duration string like `30s`, `500ms` or a bare number of seconds.
    pub volces_timeout: String,

    pub vector_enabled: bool,
    pub vector_batch_size: usize,
    pub vector_max_chars: usize,
    /// 0 means auto: `min(cpu_count, 8)`.
    pub vector_workers: usize,
    pub vector_rerank_candidates: usize,
    pub vector_overlap_chars: usize,

    pub query_top_k: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            index: IndexConfig::default(),
            query: QueryConfig::default(),
            qdrant_url: "http://127.0.0.1:6333".into(),
            qdrant_path: "~/.bcindex/qdrant".into(),
            qdrant_collection: "bcindex_vectors".into(),
            qdrant_http_port: 6333,
            qdrant_auto_start: true,
            volces_endpoint: String::new(),
            volces_api_key: String::new(),
            volces_model: String::new(),
            volces_dimensions: 1024,
            volces_encoding: "float".into(),
            volces_timeout: "30s".into(),
            vector_enabled: true,
            vector_batch_size: 8,
            vector_max_chars: 1500,
            vector_workers: 0,
            vector_rerank_candidates: 300,
            vector_overlap_chars: 80,
            query_top_k: 10,
        }
    }
}

impl AppConfig {
    /// Loads the config from `<base>/config/bcindex.yaml`.
    ///
    /// A missing file is not an error: defaults apply. `VOLCES_API_KEY`
    /// from the environment overrides the YAML credential.
    pub fn load(base_dir: &Path) -> Result<Self, LayoutError> {
        let path = Self::config_file(base_dir);
        let mut cfg = if path.is_file() {
            let text = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&text)
                .map_err(|e| LayoutError::Config(format!("{}: {e}", path.display())))?
        } else {
            debug!("AppConfig::load no config at {:?}, using defaults", path);
            Self::default()
        };

        if let Ok(key) = std::env::var("VOLCES_API_KEY") {
            if !key.trim().is_empty() {
                cfg.volces_api_key = key;
            }
        }
        Ok(cfg)
    }

    /// Path of the YAML config file under `base_dir`.
    pub fn config_file(base_dir: &Path) -> PathBuf {
        base_dir.join("config").join("bcindex.yaml")
    }

    /// Writes the default YAML. Refuses to overwrite unless `force`.
    ///
    /// Returns the written path, or `None` when an existing file was kept.
    pub fn write_default(base_dir: &Path, force: bool) -> Result<Option<PathBuf>, LayoutError> {
        let path = Self::config_file(base_dir);
        if path.exists() && !force {
            return Ok(None);
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, default_config_yaml())?;
        Ok(Some(path))
    }

    /// Effective embedding worker count: configured value, else
    /// `min(cpu_count, 8)`.
    pub fn effective_vector_workers(&self) -> usize {
        if self.vector_workers > 0 {
            return self.vector_workers;
        }
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        cpus.min(8)
    }

    /// Effective query top-k: non-positive falls back to 10.
    pub fn effective_top_k(&self, requested: i64) -> usize {
        if requested > 0 {
            requested as usize
        } else if self.query_top_k > 0 {
            self.query_top_k
        } else {
            10
        }
    }

    /// Effective report budget: non-positive falls back to 20000 chars.
    pub fn effective_max_context_chars(&self) -> usize {
        if self.query.max_context_chars > 0 {
            self.query.max_context_chars as usize
        } else {
            20_000
        }
    }

    /// Embedding HTTP timeout parsed from `volces_timeout`.
    pub fn volces_timeout_duration(&self) -> Duration {
        parse_duration(&self.volces_timeout).unwrap_or(Duration::from_secs(30))
    }

    /// Local vector store path with `~` expanded. Empty means remote.
    pub fn qdrant_path_expanded(&self) -> Option<PathBuf> {
        let raw = self.qdrant_path.trim();
        if raw.is_empty() {
            return None;
        }
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return Some(home.join(rest));
            }
        }
        Some(PathBuf::from(raw))
    }

    /// True when the vector subsystem is both enabled and configured
    /// well enough to embed (endpoint + model + credential present).
    pub fn vector_ready(&self) -> bool {
        self.vector_enabled
            && !self.volces_endpoint.trim().is_empty()
            && !self.volces_model.trim().is_empty()
            && !self.volces_api_key.trim().is_empty()
    }
}

/// Parses `30s` / `500ms` / `2m` / bare-seconds duration strings.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(ms) = s.strip_suffix("ms") {
        return ms.trim().parse::<u64>().ok().map(Duration::from_millis);
    }
    if let Some(sec) = s.strip_suffix('s') {
        return sec.trim().parse::<u64>().ok().map(Duration::from_secs);
    }
    if let Some(min) = s.strip_suffix('m') {
        return min.trim().parse::<u64>().ok().map(|m| Duration::from_secs(m * 60));
    }
    s.parse::<u64>().ok().map(Duration::from_secs)
}

/// Default YAML written by `config init`.
pub fn default_config_yaml() -> String {
    let cfg = AppConfig::default();
    serde_yaml::to_string(&cfg).expect("default config serializes")
}
