//! Remote HTTP vector database client.
//!
//! Speaks the JSON REST surface: collection creation, point upsert/delete
//! (by ids or by `{must:[{key,match:{value}}]}` filter) and filtered
//! similarity search. Health is any 2xx on `/healthz` or `/collections`.

use crate::errors::VectorError;
use crate::runtime::{ScoredPoint, VectorPayload, VectorPoint};
use reqwest::Client;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, warn};

const HTTP_TIMEOUT: Duration = Duration::from_secs(20);

/// Stateless per-request client for the remote backend.
pub struct RemoteVectorDb {
    client: Client,
    base_url: String,
}

impl RemoteVectorDb {
    /// Builds the client for `base_url` (e.g. `http://127.0.0.1:6333`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, VectorError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(VectorError::Config("vector db url is required".into()));
        }
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| VectorError::Config(format!("http client: {e}")))?;
        Ok(Self { client, base_url })
    }

    /// Any 2xx on `/healthz` or `/collections` counts as healthy.
    pub async fn health(&self) -> bool {
        for probe in ["/healthz", "/collections"] {
            let url = format!("{}{probe}", self.base_url);
            if let Ok(resp) = self.client.get(&url).send().await {
                if resp.status().is_success() {
                    return true;
                }
            }
        }
        false
    }

    /// `PUT /collections/<name>` with cosine distance. An already-existing
    /// collection is fine.
    pub async fn ensure_collection(&self, name: &str, dims: usize) -> Result<(), VectorError> {
        let url = format!("{}/collections/{name}", self.base_url);
        let body = json!({ "vectors": { "size": dims, "distance": "Cosine" } });
        let resp = self
            .client
            .put(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorError::Store(format!("create collection: {e}")))?;

        if resp.status().is_success() {
            info!("RemoteVectorDb: collection '{name}' ready (dims={dims})");
            return Ok(());
        }

        // Creation races and re-runs land here; accept when the collection
        // is actually there.
        let check = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| VectorError::Store(format!("collection info: {e}")))?;
        if check.status().is_success() {
            debug!("RemoteVectorDb: collection '{name}' already exists");
            return Ok(());
        }
        Err(VectorError::Store(format!(
            "create collection '{name}' failed with {}",
            resp.status()
        )))
    }

    /// `PUT /collections/<name>/points?wait=true`.
    pub async fn upsert_points(&self, collection: &str, points: Vec<VectorPoint>) -> Result<(), VectorError> {
        if points.is_empty() {
            return Ok(());
        }
        let url = format!("{}/collections/{collection}/points?wait=true", self.base_url);
        let body = json!({
            "points": points
                .iter()
                .map(|p| json!({ "id": p.id, "vector": p.vector, "payload": p.payload }))
                .collect::<Vec<_>>()
        });
        self.post_checked(self.client.put(&url).json(&body), "upsert points").await
    }

    /// `POST /collections/<name>/points/delete?wait=true` with explicit ids.
    pub async fn delete_points_by_ids(&self, collection: &str, ids: &[String]) -> Result<(), VectorError> {
        if ids.is_empty() {
            return Ok(());
        }
        let url = format!(
            "{}/collections/{collection}/points/delete?wait=true",
            self.base_url
        );
        let body = json!({ "points": ids });
        self.post_checked(self.client.post(&url).json(&body), "delete points").await
    }

    /// Filtered delete over payload fields.
    async fn delete_by_filter(&self, collection: &str, filter: Value) -> Result<(), VectorError> {
        let url = format!(
            "{}/collections/{collection}/points/delete?wait=true",
            self.base_url
        );
        let body = json!({ "filter": filter });
        self.post_checked(self.client.post(&url).json(&body), "delete by filter").await
    }

    pub async fn delete_points_by_repo(&self, collection: &str, repo_id: &str) -> Result<(), VectorError> {
        self.delete_by_filter(collection, must_filter(&[("repo_id", repo_id)])).await
    }

    pub async fn delete_points_by_repo_and_path(
        &self,
        collection: &str,
        repo_id: &str,
        path: &str,
    ) -> Result<(), VectorError> {
        self.delete_by_filter(collection, must_filter(&[("repo_id", repo_id), ("path", path)]))
            .await
    }

    /// `POST /collections/<name>/points/search` restricted to one repo.
    pub async fn search_similar(
        &self,
        collection: &str,
        repo_id: &str,
        vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<ScoredPoint>, VectorError> {
        let url = format!("{}/collections/{collection}/points/search", self.base_url);
        let body = json!({
            "vector": vector,
            "limit": top_k,
            "with_payload": true,
            "filter": must_filter(&[("repo_id", repo_id)]),
        });
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| VectorError::Store(format!("search: {e}")))?
            .error_for_status()
            .map_err(|e| VectorError::Store(format!("search HTTP error: {e}")))?;

        let parsed: Value = resp
            .json()
            .await
            .map_err(|e| VectorError::Store(format!("search parse: {e}")))?;
        Ok(parse_search_result(&parsed))
    }

    async fn post_checked(
        &self,
        req: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<(), VectorError> {
        let resp = req
            .send()
            .await
            .map_err(|e| VectorError::Store(format!("{what}: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            warn!("RemoteVectorDb: {what} failed status={status} body={text}");
            return Err(VectorError::Store(format!("{what} failed with {status}")));
        }
        Ok(())
    }
}

/// `{must: [{key, match: {value}}]}` conjunction filter.
fn must_filter(conditions: &[(&str, &str)]) -> Value {
    json!({
        "must": conditions
            .iter()
            .map(|(key, value)| json!({ "key": key, "match": { "value": value } }))
            .collect::<Vec<_>>()
    })
}

/// Parses `{result: [{id, score, payload}]}`.
fn parse_search_result(body: &Value) -> Vec<ScoredPoint> {
    let Some(items) = body.get("result").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let id = item.get("id")?;
            let id = id
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| id.to_string());
            let score = item.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
            let payload: VectorPayload = item
                .get("payload")
                .and_then(|p| serde_json::from_value(p.clone()).ok())
                .unwrap_or_default();
            Some(ScoredPoint { id, score, payload })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn must_filter_shape() {
        let f = must_filter(&[("repo_id", "abc"), ("path", "a.go")]);
        let must = f.get("must").unwrap().as_array().unwrap();
        assert_eq!(must.len(), 2);
        assert_eq!(must[0]["key"], "repo_id");
        assert_eq!(must[0]["match"]["value"], "abc");
        assert_eq!(must[1]["key"], "path");
    }

    #[test]
    fn search_result_parses_points() {
        let body = json!({
            "result": [
                { "id": "vec:a.go:1", "score": 0.92,
                  "payload": { "repo_id": "r", "path": "a.go", "kind": "go_func",
                                "name": "Foo", "title": "", "line_start": 3,
                                "line_end": 9, "hash": "h" } },
                { "id": 7, "score": 0.5, "payload": {} }
            ]
        });
        let points = parse_search_result(&body);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].payload.name, "Foo");
        assert_eq!(points[0].payload.line_start, 3);
        assert_eq!(points[1].id, "7");
    }

    #[test]
    fn empty_or_malformed_result_is_empty() {
        assert!(parse_search_result(&json!({})).is_empty());
        assert!(parse_search_result(&json!({"result": "x"})).is_empty());
    }
}
