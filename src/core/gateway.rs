//! Upstream chat-completion gateway client
//!
//! Defines the [`Gateway`] trait the dispatcher talks to and the HTTP
//! implementation that forwards to an OpenAI-compatible completion API.
//! No retries happen here; the caller owns retry policy.

use crate::core::config::GatewayConfig;
use crate::core::constants::role;
use crate::models::study::Message;
use crate::models::upstream::{CompletionMessage, CompletionRequest, CompletionResponse};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{Stream, TryStreamExt};
use reqwest::{Client, StatusCode};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// Raw byte stream of a streamed completion
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GatewayError>> + Send>>;

/// Error types for gateway operations
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Payment required: {0}")]
    QuotaExceeded(String),

    #[error("Gateway error (status {status}): {body}")]
    Upstream { status: u16, body: String },

    #[error("{0} not configured")]
    MissingCredential(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Result of a completion call
pub enum Completion {
    /// Whole completion, returned when `stream` was false
    Buffered(CompletionResponse),
    /// Raw event-stream body, returned when `stream` was true
    Stream(ByteStream),
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Completion::Buffered(response) => f.debug_tuple("Buffered").field(response).finish(),
            Completion::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Trait for chat-completion gateways
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Send one completion request
    ///
    /// `request.stream` selects between [`Completion::Buffered`] and
    /// [`Completion::Stream`].
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError>;

    /// Get the gateway name
    fn gateway_name(&self) -> &str;
}

/// Assemble a completion request: system prompt first, then the conversation
pub fn build_request(
    model: &str,
    system_prompt: &str,
    messages: &[Message],
    stream: bool,
) -> CompletionRequest {
    let mut upstream = Vec::with_capacity(messages.len() + 1);
    upstream.push(CompletionMessage {
        role: role::SYSTEM.to_string(),
        content: system_prompt.to_string(),
    });
    upstream.extend(messages.iter().map(|m| CompletionMessage {
        role: m.role.as_str().to_string(),
        content: m.content.clone(),
    }));

    CompletionRequest {
        model: model.to_string(),
        messages: upstream,
        stream,
    }
}

/// Map a non-success gateway status to an error
pub fn classify_status(status: StatusCode, body: String) -> GatewayError {
    match status.as_u16() {
        429 => GatewayError::RateLimited(body),
        402 => GatewayError::QuotaExceeded(body),
        code => GatewayError::Upstream { status: code, body },
    }
}

/// HTTP gateway speaking the OpenAI chat-completions protocol
pub struct HttpGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl HttpGateway {
    /// Create a new HTTP gateway
    ///
    /// # Arguments
    ///
    /// * `config` - Gateway section of the configuration
    /// * `api_key` - Bearer credential, `None` when unconfigured
    pub fn new(config: &GatewayConfig, api_key: Option<String>) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            api_key_env: config.api_key_env.clone(),
        })
    }

    async fn send(&self, request: &CompletionRequest) -> Result<reqwest::Response, GatewayError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GatewayError::MissingCredential(self.api_key_env.clone()))?;

        let url = format!("{}/chat/completions", self.base_url);
        debug!(
            "Sending completion request: model={}, stream={}, messages={}",
            request.model,
            request.stream,
            request.messages.len()
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!("Gateway error: status={}, body={}", status.as_u16(), body);
            return Err(classify_status(status, body));
        }

        Ok(response)
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
        let response = self.send(&request).await?;

        if request.stream {
            let stream = response
                .bytes_stream()
                .map_err(|e| GatewayError::Transport(e.to_string()));
            return Ok(Completion::Stream(Box::pin(stream)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(Completion::Buffered(completion))
    }

    fn gateway_name(&self) -> &str {
        &self.base_url
    }
}
