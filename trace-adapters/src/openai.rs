//! `OpenAI` Chat Completions adapter.

use std::{fmt, time::Duration};

use async_trait::async_trait;
use futures::stream;
use hyper::Uri;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http_client::{
    DEFAULT_OPENAI_BASE_URL, HyperClient, build_https_client, endpoint, post_json,
    sanitize_base_url,
};
use crate::traits::{
    AdapterError, AdapterMetadata, AdapterResult, AdapterStream, InferenceChunk, InferenceRequest,
    MessageRole, ModelAdapter, PromptMessage,
};

/// Chat model used for decisions unless configured otherwise.
pub const DEFAULT_CHAT_MODEL: &str = "gpt-4.1-nano";

/// Configuration for the `OpenAI` chat adapter.
#[derive(Clone, Debug)]
pub struct OpenAiConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl OpenAiConfig {
    /// Creates a configuration using the supplied model identifier.
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            api_key: None,
            model: model.into(),
            base_url: DEFAULT_OPENAI_BASE_URL.to_owned(),
            timeout: Duration::from_secs(60),
            default_temperature: None,
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

    /// Sets the default sampling temperature used when requests omit it.
    #[must_use]
    pub fn with_default_temperature(mut self, temperature: f32) -> Self {
        self.default_temperature = Some(temperature);
        self
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

/// Chat adapter that calls the `OpenAI` Chat Completions API over HTTPS.
pub struct OpenAiAdapter {
    client: HyperClient,
    endpoint: Uri,
    metadata: AdapterMetadata,
    api_key: String,
    timeout: Duration,
    default_temperature: Option<f32>,
}

impl fmt::Debug for OpenAiAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiAdapter")
            .field("model", &self.metadata.model())
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiAdapter {
    /// Constructs a new adapter with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if the API key is missing or
    /// the endpoint cannot be derived from the base URL.
    pub fn new(config: OpenAiConfig) -> AdapterResult<Self> {
        let api_key = config
            .api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| AdapterError::configuration("OpenAI adapter requires an API key"))?;

        let metadata = AdapterMetadata::new("openai", config.model);
        let endpoint = endpoint(&config.base_url, "v1/chat/completions")?;
        let client = build_https_client()?;

        Ok(Self {
            client,
            endpoint,
            metadata,
            api_key,
            timeout: config.timeout,
            default_temperature: config.default_temperature,
        })
    }

    fn build_request(&self, request: &InferenceRequest) -> ChatCompletionRequest {
        let system = request
            .system_prompt()
            .map(|prompt| PromptMessage::new(MessageRole::System, prompt));
        let messages = system
            .iter()
            .chain(request.messages())
            .map(map_prompt_message)
            .collect();

        ChatCompletionRequest {
            model: self.metadata.model().to_owned(),
            messages,
            temperature: request.temperature().or(self.default_temperature),
            max_tokens: request.max_output_tokens(),
            stream: false,
        }
    }
}

#[async_trait]
impl ModelAdapter for OpenAiAdapter {
    fn metadata(&self) -> &AdapterMetadata {
        &self.metadata
    }

    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream> {
        let payload = self.build_request(&request);
        let body = serde_json::to_vec(&payload).map_err(|err| {
            AdapterError::invalid_request(format!("failed to encode OpenAI request: {err}"))
        })?;

        debug!(model = %payload.model, messages = payload.messages.len(), "calling chat completions");
        let bytes = post_json(&self.client, &self.endpoint, &self.api_key, body, self.timeout).await?;

        let content = extract_content(&bytes)?;
        let stream = stream::once(async move { Ok(InferenceChunk::new(content, true)) });
        Ok(Box::pin(stream))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none", rename = "max_tokens")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn map_prompt_message(message: &PromptMessage) -> OpenAiMessage {
    OpenAiMessage {
        role: message.role().to_string(),
        content: message.content().to_owned(),
    }
}

fn extract_content(bytes: &[u8]) -> AdapterResult<String> {
    let response: ChatCompletionResponse = serde_json::from_slice(bytes)
        .map_err(|err| AdapterError::response(format!("failed to decode OpenAI response: {err}")))?;

    response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.and_then(|message| message.content))
        .ok_or_else(|| AdapterError::response("OpenAI response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_is_configuration_error() {
        let err = OpenAiAdapter::new(OpenAiConfig::new(DEFAULT_CHAT_MODEL).with_api_key("  "))
            .expect_err("blank key");
        assert!(matches!(err, AdapterError::Configuration { .. }));
    }

    #[test]
    fn prompt_mapping_preserves_role() {
        let message = PromptMessage::new(MessageRole::User, "hello");
        let mapped = map_prompt_message(&message);
        assert_eq!(mapped.role, "user");
        assert_eq!(mapped.content, "hello");
    }

    #[test]
    fn response_parsing_extracts_content() {
        let json = br#"{
            "choices": [
                { "message": null },
                { "message": { "content": "DECISION: APPROVE" } }
            ]
        }"#;
        assert_eq!(extract_content(json).unwrap(), "DECISION: APPROVE");

        let err = extract_content(br#"{"choices": []}"#).unwrap_err();
        assert!(matches!(err, AdapterError::Response { .. }));
    }

    #[test]
    fn build_request_prepends_system_prompt_and_defaults() {
        let config = OpenAiConfig::new(DEFAULT_CHAT_MODEL)
            .with_default_temperature(0.2)
            .with_api_key("test_key");
        let adapter = OpenAiAdapter::new(config).expect("adapter");
        let request = InferenceRequest::user("hello")
            .unwrap()
            .with_system_prompt("system");

        let chat = adapter.build_request(&request);
        assert_eq!(chat.model, DEFAULT_CHAT_MODEL);
        assert_eq!(chat.messages.len(), 2);
        assert_eq!(chat.messages[0].role, "system");
        assert_eq!(chat.temperature, Some(0.2));
        assert!(!chat.stream);
    }
}
