//! Embedded vector store with brute-force cosine search.
//!
//! One SQLite table (`vectors`) per database file; vectors are stored as
//! JSON arrays. All access goes through an internal mutex and a single open
//! connection.

use crate::errors::VectorError;
use crate::runtime::{ScoredPoint, VectorPayload, VectorPoint};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;
use tracing::debug;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS vectors (
    id TEXT PRIMARY KEY,
    repo_id TEXT NOT NULL,
    path TEXT NOT NULL,
    kind TEXT NOT NULL,
    name TEXT NOT NULL,
    title TEXT NOT NULL,
    line_start INTEGER NOT NULL,
    line_end INTEGER NOT NULL,
    hash TEXT NOT NULL,
    updated_at INTEGER NOT NULL,
    vector TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_vectors_repo ON vectors(repo_id);
CREATE INDEX IF NOT EXISTS idx_vectors_repo_path ON vectors(repo_id, path);
"#;

/// Local backend: cosine similarity computed in-process.
pub struct LocalVectorStore {
    conn: Mutex<Connection>,
}

impl LocalVectorStore {
    /// Opens (creating if needed) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, VectorError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        debug!("LocalVectorStore::open path={:?}", path);
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Self, VectorError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// The schema is fixed; nothing to create per collection.
    pub fn ensure_collection(&self, _name: &str, _dims: usize) -> Result<(), VectorError> {
        Ok(())
    }

    pub fn upsert_points(&self, points: &[VectorPoint]) -> Result<(), VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        let now = chrono::Utc::now().timestamp();
        for p in points {
            let vector_json = serde_json::to_string(&p.vector)
                .map_err(|e| VectorError::Store(e.to_string()))?;
            conn.execute(
                "INSERT OR REPLACE INTO vectors
                 (id, repo_id, path, kind, name, title, line_start, line_end, hash, updated_at, vector)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    p.id,
                    p.payload.repo_id,
                    p.payload.path,
                    p.payload.kind,
                    p.payload.name,
                    p.payload.title,
                    p.payload.line_start,
                    p.payload.line_end,
                    p.payload.hash,
                    now,
                    vector_json,
                ],
            )?;
        }
        Ok(())
    }

    pub fn delete_points_by_ids(&self, ids: &[String]) -> Result<(), VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        for id in ids {
            conn.execute("DELETE FROM vectors WHERE id = ?1", params![id])?;
        }
        Ok(())
    }

    pub fn delete_points_by_repo(&self, repo_id: &str) -> Result<(), VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        conn.execute("DELETE FROM vectors WHERE repo_id = ?1", params![repo_id])?;
        Ok(())
    }

    pub fn delete_points_by_repo_and_path(&self, repo_id: &str, path: &str) -> Result<(), VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        conn.execute(
            "DELETE FROM vectors WHERE repo_id = ?1 AND path = ?2",
            params![repo_id, path],
        )?;
        Ok(())
    }

    pub fn count_by_repo(&self, repo_id: &str) -> Result<i64, VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        let n = conn.query_row(
            "SELECT COUNT(*) FROM vectors WHERE repo_id = ?1",
            params![repo_id],
            |row| row.get(0),
        )?;
        Ok(n)
    }

    /// Brute-force cosine top-k over the whole repository.
    pub fn search_similar(
        &self,
        repo_id: &str,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        self.search_filtered(repo_id, query, top_k, |_payload| true)
    }

    /// Brute-force cosine restricted to candidate `(file, line)` pairs: a
    /// point qualifies when its path matches and the candidate line falls
    /// inside the point's line range.
    pub fn search_similar_candidates(
        &self,
        repo_id: &str,
        query: &[f32],
        candidates: &[(String, u32)],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        self.search_filtered(repo_id, query, top_k, |payload| {
            candidates.iter().any(|(file, line)| {
                payload.path == *file
                    && payload.line_start <= *line
                    && *line <= payload.line_end
            })
        })
    }

    fn search_filtered(
        &self,
        repo_id: &str,
        query: &[f32],
        top_k: usize,
        keep: impl Fn(&VectorPayload) -> bool,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        let conn = self.conn.lock().expect("vector store mutex");
        let mut stmt = conn.prepare(
            "SELECT id, path, kind, name, title, line_start, line_end, hash, vector
             FROM vectors WHERE repo_id = ?1",
        )?;
        let rows = stmt.query_map(params![repo_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                VectorPayload {
                    repo_id: repo_id.to_string(),
                    path: row.get(1)?,
                    kind: row.get(2)?,
                    name: row.get(3)?,
                    title: row.get(4)?,
                    line_start: row.get(5)?,
                    line_end: row.get(6)?,
                    hash: row.get(7)?,
                },
                row.get::<_, String>(8)?,
            ))
        })?;

        let mut scored = Vec::new();
        for row in rows {
            let (id, payload, vector_json) = row?;
            if !keep(&payload) {
                continue;
            }
            let vector: Vec<f32> = serde_json::from_str(&vector_json)
                .map_err(|e| VectorError::Store(format!("corrupt vector for {id}: {e}")))?;
            let score = cosine(query, &vector);
            scored.push(ScoredPoint { id, score, payload });
        }

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(top_k);
        Ok(scored)
    }
}

/// Cosine similarity; 0 for zero-norm inputs or mismatched lengths.
fn cosine(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut na = 0.0f32;
    let mut nb = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, path: &str, line_start: u32, line_end: u32, vector: Vec<f32>) -> VectorPoint {
        VectorPoint {
            id: id.into(),
            vector,
            payload: VectorPayload {
                repo_id: "repo1".into(),
                path: path.into(),
                kind: "go_func".into(),
                name: id.into(),
                title: String::new(),
                line_start,
                line_end,
                hash: "h".into(),
            },
        }
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine(&[1.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn search_ranks_by_similarity() {
        let store = LocalVectorStore::open_in_memory().unwrap();
        store
            .upsert_points(&[
                point("a", "a.go", 1, 10, vec![1.0, 0.0]),
                point("b", "b.go", 1, 10, vec![0.0, 1.0]),
                point("c", "c.go", 1, 10, vec![0.7, 0.7]),
            ])
            .unwrap();

        let hits = store.search_similar("repo1", &[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
    }

    #[test]
    fn candidate_restriction_filters_by_file_and_line() {
        let store = LocalVectorStore::open_in_memory().unwrap();
        store
            .upsert_points(&[
                point("a", "a.go", 10, 20, vec![1.0, 0.0]),
                point("b", "b.go", 1, 5, vec![1.0, 0.0]),
            ])
            .unwrap();

        let candidates = vec![("a.go".to_string(), 12u32)];
        let hits = store
            .search_similar_candidates("repo1", &[1.0, 0.0], &candidates, 10)
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[test]
    fn upsert_replaces_by_id() {
        let store = LocalVectorStore::open_in_memory().unwrap();
        store.upsert_points(&[point("a", "a.go", 1, 2, vec![1.0])]).unwrap();
        store.upsert_points(&[point("a", "a.go", 1, 2, vec![0.5])]).unwrap();
        assert_eq!(store.count_by_repo("repo1").unwrap(), 1);
    }

    #[test]
    fn repo_and_path_deletes() {
        let store = LocalVectorStore::open_in_memory().unwrap();
        store
            .upsert_points(&[
                point("a", "a.go", 1, 2, vec![1.0]),
                point("b", "b.go", 1, 2, vec![1.0]),
            ])
            .unwrap();

        store.delete_points_by_repo_and_path("repo1", "a.go").unwrap();
        assert_eq!(store.count_by_repo("repo1").unwrap(), 1);
        store.delete_points_by_repo("repo1").unwrap();
        assert_eq!(store.count_by_repo("repo1").unwrap(), 0);
    }
}
