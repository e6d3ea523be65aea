//! The chat-model seam used by the decision pipeline.
//!
//! A decision is a single-turn exchange: an optional system prompt plus one
//! user prompt, answered by a stream of text chunks. [`collect_text`] turns
//! that stream back into the full answer for parsing.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use thiserror::Error;

/// Result alias for adapter calls.
pub type AdapterResult<T> = Result<T, AdapterError>;

/// Chunks of a model answer, as returned by [`ModelAdapter::infer`].
pub type AdapterStream = Pin<Box<dyn Stream<Item = AdapterResult<InferenceChunk>> + Send>>;

/// Failures raised by chat and embedding providers.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Credentials or endpoint settings are missing or unusable.
    #[error("model provider not configured: {reason}")]
    Configuration {
        /// What is missing.
        reason: String,
    },
    /// The request cannot be sent as built.
    #[error("invalid model request: {reason}")]
    InvalidRequest {
        /// Why the request was refused.
        reason: String,
    },
    /// The provider could not be reached in time.
    #[error("model provider unreachable: {reason}")]
    Transport {
        /// Network, TLS or timeout detail.
        reason: String,
    },
    /// HTTP 429 from the provider.
    #[error("model provider rate limited the request (retry after {retry_after:?})")]
    RateLimited {
        /// Delay from the `Retry-After` header, when sent.
        retry_after: Option<Duration>,
    },
    /// Non-success status or an answer we could not read.
    #[error("model provider returned an unusable response: {reason}")]
    Response {
        /// Status line or decode failure.
        reason: String,
    },
}

impl AdapterError {
    /// Builds [`AdapterError::InvalidRequest`].
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::Configuration`].
    #[must_use]
    pub fn configuration(reason: impl Into<String>) -> Self {
        Self::Configuration {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::Transport`].
    #[must_use]
    pub fn transport(reason: impl Into<String>) -> Self {
        Self::Transport {
            reason: reason.into(),
        }
    }

    /// Builds [`AdapterError::Response`].
    #[must_use]
    pub fn response(reason: impl Into<String>) -> Self {
        Self::Response {
            reason: reason.into(),
        }
    }
}

/// Provider and model behind an adapter; the model name is stored on
/// recorded decisions as `llm_model`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterMetadata {
    provider: &'static str,
    model: String,
}

impl AdapterMetadata {
    /// Describes `model` served by `provider`.
    #[must_use]
    pub fn new(provider: &'static str, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Provider name, e.g. `openai`.
    #[must_use]
    pub const fn provider(&self) -> &'static str {
        self.provider
    }

    /// Model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Who a prompt message speaks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageRole {
    /// Instructions framing the exchange.
    System,
    /// The decision prompt.
    User,
}

impl MessageRole {
    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message of a prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptMessage {
    role: MessageRole,
    content: String,
}

impl PromptMessage {
    /// Creates a message.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Role of the message.
    #[must_use]
    pub const fn role(&self) -> MessageRole {
        self.role
    }

    /// Text of the message.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A prompt plus sampling options.
#[derive(Clone, Debug, PartialEq)]
pub struct InferenceRequest {
    system_prompt: Option<String>,
    messages: Vec<PromptMessage>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl InferenceRequest {
    /// Creates a request from `messages`.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] when `messages` is empty.
    pub fn new(messages: Vec<PromptMessage>) -> AdapterResult<Self> {
        if messages.is_empty() {
            return Err(AdapterError::invalid_request("a prompt needs at least one message"));
        }
        Ok(Self {
            system_prompt: None,
            messages,
            max_output_tokens: None,
            temperature: None,
        })
    }

    /// Creates a request with `prompt` as the only user message.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::InvalidRequest`] for a blank prompt.
    pub fn user(prompt: impl Into<String>) -> AdapterResult<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(AdapterError::invalid_request("prompt cannot be empty"));
        }
        Self::new(vec![PromptMessage::new(MessageRole::User, prompt)])
    }

    /// Adds a system prompt, sent ahead of the messages.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Caps the answer length.
    #[must_use]
    pub fn with_max_output_tokens(mut self, tokens: u32) -> Self {
        self.max_output_tokens = Some(tokens);
        self
    }

    /// Overrides the adapter's default temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// The system prompt, if any.
    #[must_use]
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// The prompt messages.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }

    /// The answer length cap, if any.
    #[must_use]
    pub const fn max_output_tokens(&self) -> Option<u32> {
        self.max_output_tokens
    }

    /// The requested temperature, if any.
    #[must_use]
    pub const fn temperature(&self) -> Option<f32> {
        self.temperature
    }
}

/// A piece of a model answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InferenceChunk {
    /// Text appended by this chunk.
    pub delta: String,
    /// Set on the last chunk.
    pub done: bool,
}

impl InferenceChunk {
    /// Creates a chunk.
    #[must_use]
    pub fn new(delta: impl Into<String>, done: bool) -> Self {
        Self {
            delta: delta.into(),
            done,
        }
    }
}

/// A chat model that answers decision prompts.
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    /// Provider and model served by this adapter.
    fn metadata(&self) -> &AdapterMetadata;

    /// Sends `request` and returns the answer as a stream of chunks.
    async fn infer(&self, request: InferenceRequest) -> AdapterResult<AdapterStream>;
}

/// Concatenates a stream into the full answer, stopping after the chunk
/// flagged `done`.
///
/// # Errors
///
/// Returns the first error yielded by the stream.
pub async fn collect_text(mut stream: AdapterStream) -> AdapterResult<String> {
    let mut text = String::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        text.push_str(&chunk.delta);
        if chunk.done {
            break;
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    #[test]
    fn rejects_empty_prompts() {
        let err = InferenceRequest::new(Vec::new()).unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));

        let err = InferenceRequest::user("   ").unwrap_err();
        assert!(matches!(err, AdapterError::InvalidRequest { .. }));
    }

    #[test]
    fn user_request_carries_options() {
        let request = InferenceRequest::user("Customer wants a refund")
            .unwrap()
            .with_system_prompt("Answer in the requested format")
            .with_max_output_tokens(256)
            .with_temperature(0.2);

        assert_eq!(request.messages().len(), 1);
        assert_eq!(request.messages()[0].role(), MessageRole::User);
        assert_eq!(request.messages()[0].content(), "Customer wants a refund");
        assert_eq!(request.system_prompt(), Some("Answer in the requested format"));
        assert_eq!(request.max_output_tokens(), Some(256));
        assert_eq!(request.temperature(), Some(0.2));
        assert_eq!(MessageRole::System.to_string(), "system");
    }

    #[tokio::test]
    async fn collect_text_stops_at_done() {
        let chunks = vec![
            Ok(InferenceChunk::new("DECISION: ", false)),
            Ok(InferenceChunk::new("APPROVE", true)),
            Ok(InferenceChunk::new("ignored", true)),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));
        assert_eq!(collect_text(stream).await.unwrap(), "DECISION: APPROVE");
    }

    #[tokio::test]
    async fn collect_text_propagates_errors() {
        let chunks = vec![
            Ok(InferenceChunk::new("partial", false)),
            Err(AdapterError::transport("connection reset")),
        ];
        let stream: AdapterStream = Box::pin(stream::iter(chunks));
        let err = collect_text(stream).await.unwrap_err();
        assert!(matches!(err, AdapterError::Transport { .. }));
    }
}
