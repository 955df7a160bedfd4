//! Point/payload models and the embed-and-store runtime used by the
//! indexing workers and the query engine.

use crate::backend::VectorBackend;
use crate::chunk::VectorChunk;
use crate::embed::EmbeddingClient;
use crate::errors::VectorError;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Payload stored alongside every vector point.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct VectorPayload {
    pub repo_id: String,
    pub path: String,
    pub kind: String,
    pub name: String,
    pub title: String,
    pub line_start: u32,
    pub line_end: u32,
    pub hash: String,
}

/// One point to upsert.
#[derive(Clone, Debug, Serialize)]
pub struct VectorPoint {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

/// One similarity hit.
#[derive(Clone, Debug)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: VectorPayload,
}

/// Embedder plus backend plus target collection, bound to one repository.
pub struct VectorRuntime {
    embedder: EmbeddingClient,
    backend: VectorBackend,
    collection: String,
    repo_id: String,
    batch_size: usize,
}

impl VectorRuntime {
    pub fn new(
        embedder: EmbeddingClient,
        backend: VectorBackend,
        collection: impl Into<String>,
        repo_id: impl Into<String>,
        batch_size: usize,
    ) -> Self {
        Self {
            embedder,
            backend,
            collection: collection.into(),
            repo_id: repo_id.into(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn backend(&self) -> &VectorBackend {
        &self.backend
    }

    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// Ensures the collection exists with the embedder's dimensionality.
    pub async fn prepare(&self) -> Result<(), VectorError> {
        self.backend
            .ensure_collection(&self.collection, self.embedder.dimensions())
            .await
    }

    /// Drops every point of this repository (full rebuild).
    pub async fn purge_repo(&self) -> Result<(), VectorError> {
        info!("VectorRuntime::purge_repo repo_id={}", self.repo_id);
        self.backend
            .delete_points_by_repo(&self.collection, &self.repo_id)
            .await
    }

    /// Drops the points of one path (delta reindex / delete).
    pub async fn purge_path(&self, path: &str) -> Result<(), VectorError> {
        self.backend
            .delete_points_by_repo_and_path(&self.collection, &self.repo_id, path)
            .await
    }

    /// Deletes explicit point ids (delta delete via the id registry).
    pub async fn delete_ids(&self, ids: &[String]) -> Result<(), VectorError> {
        self.backend.delete_points_by_ids(&self.collection, ids).await
    }

    /// Embeds `chunks` in batches and upserts the points. Returns the point
    /// ids so the caller can register them in the `vector_docs` table.
    pub async fn embed_and_upsert(&self, chunks: &[VectorChunk]) -> Result<Vec<String>, VectorError> {
        let mut ids = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_texts(&texts).await?;

            let mut points = Vec::with_capacity(batch.len());
            for e in embeddings {
                let Some(chunk) = batch.get(e.index) else {
                    return Err(VectorError::Provider(format!(
                        "embedding index {} out of range for batch of {}",
                        e.index,
                        batch.len()
                    )));
                };
                points.push(VectorPoint {
                    id: chunk.id.clone(),
                    vector: e.vector,
                    payload: VectorPayload {
                        repo_id: self.repo_id.clone(),
                        path: chunk.file.clone(),
                        kind: chunk.kind.as_str().to_string(),
                        name: chunk.name.clone(),
                        title: chunk.title.clone(),
                        line_start: chunk.line_start,
                        line_end: chunk.line_end,
                        hash: chunk.hash.clone(),
                    },
                });
            }
            ids.extend(points.iter().map(|p| p.id.clone()));
            self.backend.upsert_points(&self.collection, points).await?;
        }
        debug!("VectorRuntime::embed_and_upsert points={}", ids.len());
        Ok(ids)
    }

    /// Embeds a query string (single-item batch).
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>, VectorError> {
        let mut items = self.embedder.embed_texts(&[text.to_string()]).await?;
        items
            .pop()
            .map(|e| e.vector)
            .ok_or_else(|| VectorError::Provider("empty embedding response".into()))
    }

    /// Unrestricted top-k similarity search for this repository.
    pub async fn search_similar(
        &self,
        query_vec: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        self.backend
            .search_similar(&self.collection, &self.repo_id, query_vec, top_k)
            .await
    }

    /// Candidate-restricted rerank; only the Local backend supports it.
    /// Returns `None` on Remote so callers can fall back to
    /// [`VectorRuntime::search_similar`].
    pub fn search_similar_candidates(
        &self,
        query_vec: &[f32],
        candidates: &[(String, u32)],
        top_k: usize,
    ) -> Option<Result<Vec<ScoredPoint>, VectorError>> {
        match &self.backend {
            VectorBackend::Local(store) => {
                Some(store.search_similar_candidates(&self.repo_id, query_vec, candidates, top_k))
            }
            VectorBackend::Remote(_) => None,
        }
    }
}
