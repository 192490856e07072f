//! Remote embedding over HTTP.
//!
//! Supports three payload dialects:
//!
//! - `huggingface`: `{"inputs": [..]}` against a feature-extraction pipeline
//! - `openai`: `{"input": [..], "model": ".."}`, response under `data[].embedding`
//! - `custom`: `{"texts": [..]}`, response under `embeddings` or a bare array
//!
//! No retries happen here; retry and backoff belong to the caller.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::normalize::l2_normalize_in_place;
use crate::{EmbedError, EmbeddingPort};

/// Remote payload dialect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ApiProvider {
    HuggingFace,
    OpenAi,
    #[default]
    Custom,
}

impl ApiProvider {
    /// Lenient parse used for config strings; unknown names map to `Custom`.
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "hf" | "huggingface" => ApiProvider::HuggingFace,
            "openai" | "gpt" => ApiProvider::OpenAi,
            _ => ApiProvider::Custom,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpEmbedderConfig {
    /// Endpoint receiving the POST.
    pub url: String,
    pub provider: ApiProvider,
    /// Model label; also sent in the OpenAI payload.
    pub model_name: String,
    /// Full `Authorization` header value, e.g. `"Bearer hf_xxx"`.
    pub auth_header: Option<String>,
    pub timeout_secs: u64,
    /// L2-normalize returned vectors.
    pub normalize: bool,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            provider: ApiProvider::default(),
            model_name: "all-MiniLM-L6-v2".into(),
            auth_header: None,
            timeout_secs: 30,
            normalize: true,
        }
    }
}

pub struct HttpEmbedder {
    client: reqwest::Client,
    cfg: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(cfg: HttpEmbedderConfig) -> Result<Self, EmbedError> {
        if cfg.url.trim().is_empty() {
            return Err(EmbedError::InvalidConfig("url must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| EmbedError::InvalidConfig(format!("http client: {e}")))?;
        Ok(Self { client, cfg })
    }

    pub fn config(&self) -> &HttpEmbedderConfig {
        &self.cfg
    }

    async fn send(&self, payload: Value) -> Result<Value, EmbedError> {
        let mut request = self.client.post(&self.cfg.url).json(&payload);
        if let Some(header) = self.cfg.auth_header.as_deref() {
            request = request.header("Authorization", header);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbedError::Http(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedError::Http(format!("status {status}: {body}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| EmbedError::Backend(format!("invalid JSON response: {e}")))
    }
}

#[async_trait]
impl EmbeddingPort for HttpEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let payload = build_payload(self.cfg.provider, texts, &self.cfg.model_name);
        debug!(batch = texts.len(), url = %self.cfg.url, "http_embed_request");
        let response = self.send(payload).await?;

        let mut vectors = parse_embeddings(response)?;
        if self.cfg.normalize {
            vectors.iter_mut().for_each(|v| l2_normalize_in_place(v));
        }
        Ok(vectors)
    }

    fn model_name(&self) -> &str {
        &self.cfg.model_name
    }
}

pub(crate) fn build_payload(provider: ApiProvider, texts: &[String], model: &str) -> Value {
    match provider {
        ApiProvider::HuggingFace => json!({ "inputs": texts }),
        ApiProvider::OpenAi => json!({ "input": texts, "model": model }),
        ApiProvider::Custom => json!({ "texts": texts }),
    }
}

pub(crate) fn parse_embeddings(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Object(mut map) => {
            if let Some(embeddings) = map.remove("embeddings") {
                return parse_collection(embeddings);
            }
            if let Some(Value::Array(items)) = map.remove("data") {
                return items
                    .into_iter()
                    .map(|item| match item {
                        Value::Object(mut obj) => obj
                            .remove("embedding")
                            .ok_or_else(|| {
                                EmbedError::Backend("missing `embedding` in data item".into())
                            })
                            .and_then(parse_vector),
                        _ => Err(EmbedError::Backend(
                            "unexpected entry inside `data` array".into(),
                        )),
                    })
                    .collect();
            }
            Err(EmbedError::Backend("unsupported response shape".into()))
        }
        other => parse_collection(other),
    }
}

fn parse_collection(value: Value) -> Result<Vec<Vec<f32>>, EmbedError> {
    match value {
        Value::Array(items) if items.is_empty() => Ok(Vec::new()),
        Value::Array(items) if items.iter().all(Value::is_array) => {
            items.into_iter().map(parse_vector).collect()
        }
        other => parse_vector(other).map(|v| vec![v]),
    }
}

fn parse_vector(value: Value) -> Result<Vec<f32>, EmbedError> {
    match value {
        Value::Array(values) => values
            .into_iter()
            .map(|entry| match entry {
                Value::Number(num) => num
                    .as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| EmbedError::Backend("non-finite embedding value".into())),
                other => Err(EmbedError::Backend(format!(
                    "embedding entries must be numbers, got {other}"
                ))),
            })
            .collect(),
        other => Err(EmbedError::Backend(format!(
            "embedding vector must be an array, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_names() {
        assert_eq!(ApiProvider::from_name("HF"), ApiProvider::HuggingFace);
        assert_eq!(ApiProvider::from_name("openai"), ApiProvider::OpenAi);
        assert_eq!(ApiProvider::from_name("anything"), ApiProvider::Custom);
    }

    #[test]
    fn payload_dialects() {
        let texts = vec!["a".to_string(), "b".to_string()];
        assert_eq!(
            build_payload(ApiProvider::HuggingFace, &texts, "m"),
            json!({ "inputs": ["a", "b"] })
        );
        assert_eq!(
            build_payload(ApiProvider::OpenAi, &texts, "m"),
            json!({ "input": ["a", "b"], "model": "m" })
        );
        assert_eq!(
            build_payload(ApiProvider::Custom, &texts, "m"),
            json!({ "texts": ["a", "b"] })
        );
    }

    #[test]
    fn parses_bare_batch() {
        let out = parse_embeddings(json!([[1.0, 2.0], [3.0, 4.0]])).unwrap();
        assert_eq!(out, vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }

    #[test]
    fn parses_single_vector() {
        let out = parse_embeddings(json!([0.5, 0.25])).unwrap();
        assert_eq!(out, vec![vec![0.5, 0.25]]);
    }

    #[test]
    fn parses_openai_shape() {
        let out = parse_embeddings(json!({
            "data": [{ "embedding": [1.0] }, { "embedding": [2.0] }]
        }))
        .unwrap();
        assert_eq!(out, vec![vec![1.0], vec![2.0]]);
    }

    #[test]
    fn parses_embeddings_key() {
        let out = parse_embeddings(json!({ "embeddings": [[1.0, 0.0]] })).unwrap();
        assert_eq!(out, vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn rejects_unknown_shape() {
        assert!(parse_embeddings(json!({ "vectors": [] })).is_err());
        assert!(parse_embeddings(json!([["x"]])).is_err());
    }

    #[test]
    fn empty_url_rejected() {
        assert!(matches!(
            HttpEmbedder::new(HttpEmbedderConfig::default()),
            Err(EmbedError::InvalidConfig(_))
        ));
    }
}
