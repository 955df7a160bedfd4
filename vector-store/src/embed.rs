//! Embedding client for the remote multimodal-text endpoint.
//!
//! One POST per batch; returned items carry their input index so callers can
//! reassemble out-of-order responses. The response `data` arrives in four
//! shapes in the wild (array, single object, nested `{data:[…]}`, bare
//! `{embedding:[…]}`) and all of them parse.

use crate::errors::VectorError;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Configuration for the embedding backend.
#[derive(Clone, Debug)]
pub struct EmbedConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Expected embedding dimensionality.
    pub dimensions: usize,
    /// Wire encoding hint (e.g. "float").
    pub encoding: String,
    pub timeout: Duration,
}

/// One embedding result keyed by its input index.
#[derive(Clone, Debug)]
pub struct Embedding {
    pub index: usize,
    pub vector: Vec<f32>,
}

/// Async embedding client. Cheap to clone; safe for concurrent use by the
/// worker pool.
#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    cfg: EmbedConfig,
}

#[derive(Serialize)]
struct InputItem<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<InputItem<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    encoding_format: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

impl EmbeddingClient {
    /// Builds the client.
    ///
    /// # Errors
    /// Returns [`VectorError::Config`] when endpoint, model or credential is
    /// missing, or the HTTP client cannot be constructed.
    pub fn new(cfg: EmbedConfig) -> Result<Self, VectorError> {
        if cfg.endpoint.trim().is_empty() {
            return Err(VectorError::Config("embedding endpoint is required".into()));
        }
        if cfg.model.trim().is_empty() {
            return Err(VectorError::Config("embedding model is required".into()));
        }
        if cfg.api_key.trim().is_empty() {
            return Err(VectorError::Config("embedding api key is required".into()));
        }
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(|e| VectorError::Config(format!("http client: {e}")))?;
        Ok(Self { client, cfg })
    }

    /// Embedding dimensionality the collection must be created with.
    pub fn dimensions(&self) -> usize {
        self.cfg.dimensions
    }

    /// Embeds one batch of texts with a single request.
    ///
    /// # Errors
    /// Returns [`VectorError::Provider`] on transport/HTTP/parse failures and
    /// [`VectorError::SizeMismatch`] when a vector has the wrong dimension.
    pub async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Embedding>, VectorError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!("EmbeddingClient::embed_texts batch={}", texts.len());

        let req = EmbedRequest {
            model: &self.cfg.model,
            input: texts
                .iter()
                .map(|t| InputItem { kind: "text", text: t })
                .collect(),
            encoding_format: if self.cfg.encoding.is_empty() {
                None
            } else {
                Some(&self.cfg.encoding)
            },
            dimensions: if self.cfg.dimensions > 0 {
                Some(self.cfg.dimensions)
            } else {
                None
            },
        };

        let resp = self
            .client
            .post(&self.cfg.endpoint)
            .bearer_auth(&self.cfg.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| VectorError::Provider(format!("embedding request failed: {e}")))?
            .error_for_status()
            .map_err(|e| VectorError::Provider(format!("embedding HTTP error: {e}")))?;

        let body: Value = resp
            .json()
            .await
            .map_err(|e| VectorError::Provider(format!("embedding JSON parse failed: {e}")))?;

        let items = parse_embeddings(&body)?;
        for item in &items {
            if self.cfg.dimensions > 0 && item.vector.len() != self.cfg.dimensions {
                return Err(VectorError::SizeMismatch {
                    got: item.vector.len(),
                    want: self.cfg.dimensions,
                });
            }
        }
        trace!("EmbeddingClient::embed_texts got {} vectors", items.len());
        Ok(items)
    }
}

/// Parses every response shape the endpoint is known to produce.
pub(crate) fn parse_embeddings(body: &Value) -> Result<Vec<Embedding>, VectorError> {
    let data = body.get("data").unwrap_or(body);

    if let Some(arr) = data.as_array() {
        return arr
            .iter()
            .enumerate()
            .map(|(i, item)| parse_item(item, i))
            .collect();
    }
    if let Some(nested) = data.get("data").and_then(Value::as_array) {
        return nested
            .iter()
            .enumerate()
            .map(|(i, item)| parse_item(item, i))
            .collect();
    }
    if data.get("embedding").is_some() {
        return Ok(vec![parse_item(data, 0)?]);
    }
    Err(VectorError::Provider(format!(
        "unrecognized embedding response shape: {}",
        truncate_for_log(body)
    )))
}

fn parse_item(item: &Value, fallback_index: usize) -> Result<Embedding, VectorError> {
    let vector = item
        .get("embedding")
        .and_then(Value::as_array)
        .ok_or_else(|| VectorError::Provider("embedding item without vector".into()))?
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect();
    let index = item
        .get("index")
        .and_then(Value::as_u64)
        .map(|i| i as usize)
        .unwrap_or(fallback_index);
    Ok(Embedding { index, vector })
}

fn truncate_for_log(v: &Value) -> String {
    let s = v.to_string();
    s.chars().take(200).collect()
}
