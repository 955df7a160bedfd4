//! Repository id derivation and the per-repo directory tree.

use crate::errors::LayoutError;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves the user base directory for all bcindex state.
///
/// Order: `BCINDEX_HOME` env var, then `~/.bcindex`.
pub fn resolve_base_dir() -> Result<PathBuf, LayoutError> {
    if let Ok(dir) = std::env::var("BCINDEX_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = dirs::home_dir()
        .ok_or_else(|| LayoutError::Config("cannot resolve home directory".into()))?;
    Ok(home.join(".bcindex"))
}

/// Stable repository id: hex SHA-1 over the absolute root path string.
///
/// Changing the root path yields a different id and therefore a fresh
/// per-repo directory.
pub fn repo_id_for_root(root: &Path) -> String {
    let mut h = Sha1::new();
    h.update(root.to_string_lossy().as_bytes());
    let digest = h.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Immutable per-repository path set.
///
/// All artifact areas hang off `repos/<repo_id>/` under the base dir:
/// `text/` (full-text index), `symbol/symbols.db` (relational store),
/// `qdrant/` (local vector store) and `meta/repo.json`.
#[derive(Clone, Debug)]
pub struct RepoPaths {
    pub repo_id: String,
    pub root: PathBuf,
    pub base_dir: PathBuf,
    pub repo_dir: PathBuf,
    pub text_dir: PathBuf,
    pub symbol_dir: PathBuf,
    pub vector_dir: PathBuf,
    pub meta_dir: PathBuf,
    pub meta_file: PathBuf,
}

impl RepoPaths {
    /// Resolves the path set for `root` under `base_dir`.
    ///
    /// The root is canonicalized so the id is stable across relative
    /// invocations from different working directories.
    ///
    /// # Errors
    /// Returns [`LayoutError::RootNotFound`] when the root does not exist.
    pub fn resolve(root: impl AsRef<Path>, base_dir: impl Into<PathBuf>) -> Result<Self, LayoutError> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|_| LayoutError::RootNotFound(root.display().to_string()))?;
        let base_dir = base_dir.into();
        let repo_id = repo_id_for_root(&root);
        let repo_dir = base_dir.join("repos").join(&repo_id);
        let meta_dir = repo_dir.join("meta");

        debug!("RepoPaths::resolve root={:?} repo_id={}", root, repo_id);

        Ok(Self {
            repo_id,
            root,
            text_dir: repo_dir.join("text"),
            symbol_dir: repo_dir.join("symbol"),
            vector_dir: repo_dir.join("qdrant"),
            meta_file: meta_dir.join("repo.json"),
            meta_dir,
            repo_dir,
            base_dir,
        })
    }

    /// Locates an already-initialized repo by its id (no root needed).
    ///
    /// Used by `--repo <id>` entry points; the root is read back from the
    /// persisted meta record.
    ///
    /// # Errors
    /// Returns [`LayoutError::Meta`] when no meta record exists for the id.
    pub fn from_repo_id(repo_id: &str, base_dir: impl Into<PathBuf>) -> Result<Self, LayoutError> {
        let base_dir = base_dir.into();
        let repo_dir = base_dir.join("repos").join(repo_id);
        let meta_dir = repo_dir.join("meta");
        let meta_file = meta_dir.join("repo.json");
        let meta = crate::meta::RepoMeta::load(&meta_file)?;

        Ok(Self {
            repo_id: repo_id.to_string(),
            root: PathBuf::from(meta.root),
            text_dir: repo_dir.join("text"),
            symbol_dir: repo_dir.join("symbol"),
            vector_dir: repo_dir.join("qdrant"),
            meta_file,
            meta_dir,
            repo_dir,
            base_dir,
        })
    }

    /// Creates the artifact directories (text/symbol/vector/meta).
    pub fn ensure_dirs(&self) -> Result<(), LayoutError> {
        for d in [&self.text_dir, &self.symbol_dir, &self.vector_dir, &self.meta_dir] {
            std::fs::create_dir_all(d)?;
        }
        Ok(())
    }

    /// Path of the relational store database file.
    pub fn symbol_db(&self) -> PathBuf {
        self.symbol_dir.join("symbols.db")
    }

    /// Path of the local vector store database file.
    pub fn vector_db(&self) -> PathBuf {
        self.vector_dir.join("vectors.db")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_id_is_stable_and_hex() {
        let id1 = repo_id_for_root(Path::new("/tmp/project"));
        let id2 = repo_id_for_root(Path::new("/tmp/project"));
        assert_eq!(id1, id2);
        assert_eq!(id1.len(), 40);
        assert!(id1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn different_roots_get_different_ids() {
        assert_ne!(
            repo_id_for_root(Path::new("/tmp/a")),
            repo_id_for_root(Path::new("/tmp/b"))
        );
    }

    #[test]
    fn resolve_builds_repo_tree() {
        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path().join("proj");
        std::fs::create_dir_all(&root).unwrap();
        let base = tmp.path().join("base");

        let paths = RepoPaths::resolve(&root, &base).unwrap();
        assert!(paths.repo_dir.starts_with(base.join("repos")));
        assert_eq!(paths.meta_file, paths.meta_dir.join("repo.json"));
        paths.ensure_dirs().unwrap();
        assert!(paths.text_dir.is_dir());
        assert!(paths.symbol_dir.is_dir());
    }

    #[test]
    fn resolve_rejects_missing_root() {
        let tmp = tempfile::TempDir::new().unwrap();
        let err = RepoPaths::resolve(tmp.path().join("nope"), tmp.path()).unwrap_err();
        assert!(matches!(err, LayoutError::RootNotFound(_)));
    }
}
