//! Sealed backend pair with a common capability set.

use crate::errors::VectorError;
use crate::local::LocalVectorStore;
use crate::remote::RemoteVectorDb;
use crate::runtime::{ScoredPoint, VectorPoint};

/// The two interchangeable vector persistence backends.
///
/// Candidate-restricted search is a [`LocalVectorStore`] method only;
/// callers pattern-match and fall back to the unrestricted search on
/// `Remote`.
pub enum VectorBackend {
    Local(LocalVectorStore),
    Remote(RemoteVectorDb),
}

impl VectorBackend {
    pub async fn ensure_collection(&self, name: &str, dims: usize) -> Result<(), VectorError> {
        match self {
            VectorBackend::Local(s) => s.ensure_collection(name, dims),
            VectorBackend::Remote(r) => r.ensure_collection(name, dims).await,
        }
    }

    pub async fn upsert_points(
        &self,
        collection: &str,
        points: Vec<VectorPoint>,
    ) -> Result<(), VectorError> {
        match self {
            VectorBackend::Local(s) => s.upsert_points(&points),
            VectorBackend::Remote(r) => r.upsert_points(collection, points).await,
        }
    }

    pub async fn delete_points_by_ids(
        &self,
        collection: &str,
        ids: &[String],
    ) -> Result<(), VectorError> {
        match self {
            VectorBackend::Local(s) => s.delete_points_by_ids(ids),
            VectorBackend::Remote(r) => r.delete_points_by_ids(collection, ids).await,
        }
    }

    pub async fn delete_points_by_repo(
        &self,
        collection: &str,
        repo_id: &str,
    ) -> Result<(), VectorError> {
        match self {
            VectorBackend::Local(s) => s.delete_points_by_repo(repo_id),
            VectorBackend::Remote(r) => r.delete_points_by_repo(collection, repo_id).await,
        }
    }

    pub async fn delete_points_by_repo_and_path(
        &self,
        collection: &str,
        repo_id: &str,
        path: &str,
    ) -> Result<(), VectorError> {
        match self {
            VectorBackend::Local(s) => s.delete_points_by_repo_and_path(repo_id, path),
            VectorBackend::Remote(r) => {
                r.delete_points_by_repo_and_path(collection, repo_id, path).await
            }
        }
    }

    pub async fn search_similar(
        &self,
        collection: &str,
        repo_id: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        match self {
            VectorBackend::Local(s) => s.search_similar(repo_id, vector, top_k),
            VectorBackend::Remote(r) => r.search_similar(collection, repo_id, vector, top_k).await,
        }
    }
}
