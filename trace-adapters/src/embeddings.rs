//! Text embedding adapters used for precedent search.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{
    DEFAULT_OPENAI_BASE_URL, HyperClient, build_https_client, endpoint, post_json,
    sanitize_base_url,
};
use crate::traits::{AdapterError, AdapterMetadata, AdapterResult};

/// Embedding model used unless configured otherwise (1536 dimensions).
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Trait implemented by embedding providers.
#[async_trait]
pub trait EmbeddingAdapter: Send + Sync {
    /// Returns metadata describing the adapter instance.
    fn metadata(&self) -> &AdapterMetadata;

    /// Embeds `text` into a dense vector.
    async fn embed(&self, text: &str) -> AdapterResult<Vec<f32>>;
}

/// Configuration for [`OpenAiEmbeddingAdapter`].
#[derive(Clone, Debug)]
pub struct OpenAiEmbeddingConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
}

impl OpenAiEmbeddingConfig {
    /// Creates a configuration for the supplied embedding model.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Overrides the base URL used for API calls.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the supplied URL is invalid.
    pub fn with_base_url(mut self, base_url: impl AsRef<str>) -> AdapterResult<Self> {
        self.base_url = sanitize_base_url(base_url.as_ref())?;
        Ok(self)
    }

    /// Sets the HTTP request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Supplies an explicit API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// Embedding adapter backed by the `OpenAI` Embeddings API.
pub struct OpenAiEmbeddingAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
}

impl fmt::Debug for OpenAiEmbeddingAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiEmbeddingAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiEmbeddingAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing.
    pub fn new(config: OpenAiEmbeddingConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AdapterError::configuration("OpenAI embeddings require an API key")
            })?;

        Ok(Self {
            client: build_https_client()?,
            endpoint: endpoint(&config.base_url, "v1/embeddings")?,
            metadata: AdapterMetadata::new("openai", config.model),
            api_key,
            timeout: config.timeout,
        })
    }
}

#[async_trait]
impl EmbeddingAdapter for OpenAiEmbeddingAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn embed(&self, text: &str) -> AdapterResult<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(AdapterError::invalid_request("cannot embed empty text"));
        }

        let payload = EmbeddingRequest {
            model: self.metadata.model(),
            input: text,
        };
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode embedding request: {err}"))
        })?;

        debug!(model = %self.metadata.model(), chars = text.len(), "requesting embedding");
        let bytes = post_json(&self.client, &self.endpoint, &self.api_key, body, self.timeout).await?;
        extract_embedding(&bytes)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

fn extract_embedding(bytes: &[u8]) -> AdapterResult<Vec<f32>> {
    let response: EmbeddingResponse = serde_json::from_slice(bytes).map_err(|err| {
        AdapterError::response(format!("failed to decode embedding response: {err}"))
    })?;

    response
        .data
        .into_iter()
        .next()
        .map(|data| data.embedding)
        .filter(|embedding| !embedding.is_empty())
        .ok_or_else(|| AdapterError::response("embedding response contained no vectors"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> OpenAiEmbeddingAdapter {
        OpenAiEmbeddingAdapter::new(
            OpenAiEmbeddingConfig::new(DEFAULT_EMBEDDING_MODEL).with_api_key("test_key"),
        )
        .expect("adapter")
    }

    #[test]
    fn requires_api_key() {
        let err = OpenAiEmbeddingAdapter::new(OpenAiEmbeddingConfig::new(DEFAULT_EMBEDDING_MODEL))
            .expect_err("no key");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn endpoint_follows_base_url() {
        let adapter = OpenAiEmbeddingAdapter::new(
            OpenAiEmbeddingConfig::new(DEFAULT_EMBEDDING_MODEL)
                .with_api_key("test_key")
                .with_base_url("http://localhost:8080/proxy")
                .unwrap(),
        )
        .unwrap();
        assert_eq!(adapter.endpoint.path(), "/proxy/v1/embeddings");
    }

    #[test]
    fn extracts_first_vector() {
        let json = br#"{"data": [{"embedding": [0.5, -0.25]}, {"embedding": [1.0]}]}"#;
        assert_eq!(extract_embedding(json).unwrap(), vec![0.5, -0.25]);

        let err = extract_embedding(br#"{"data": []}"#).unwrap_err();
        assert!(matches!(err, AdapterError::Response { .. }));
    }

    #[tokio::test]
    async fn rejects_blank_input_without_calling_provider() {
        let err = adapter().embed("  ").await.unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }
}
