//! Mode dispatcher
//!
//! Turns one inbound [`ChatRequest`] into exactly one gateway call and shapes
//! the result: a JSON document for buffered modes, or the untouched upstream
//! byte stream for streaming modes. Holds no state across requests.

use crate::core::error::ErrorKind;
use crate::core::gateway::{ByteStream, Completion, Gateway, GatewayError, build_request};
use crate::core::prompts;
use crate::models::study::{ChatRequest, Mode, ResponseShape};
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

/// Characters of an unparseable quiz completion kept in the log line
const QUIZ_LOG_PREVIEW_CHARS: usize = 500;

/// Failure of a dispatched request
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Rate limited")]
    RateLimited,

    #[error("Payment required")]
    QuotaExceeded,

    #[error("AI error")]
    Upstream { status: u16, detail: String },

    #[error("Failed to generate questions")]
    MalformedUpstreamPayload { raw: String },

    #[error("{0}")]
    Internal(String),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::RateLimited => ErrorKind::RateLimited,
            DispatchError::QuotaExceeded => ErrorKind::QuotaExceeded,
            DispatchError::Upstream { .. } => ErrorKind::UpstreamError,
            DispatchError::MalformedUpstreamPayload { .. } => ErrorKind::MalformedUpstreamPayload,
            DispatchError::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Structured body returned to the caller
    pub fn to_body(&self) -> Value {
        match self {
            DispatchError::MalformedUpstreamPayload { raw } => json!({
                "error": self.to_string(),
                "kind": self.kind().as_str(),
                "raw": raw,
            }),
            _ => json!({
                "error": self.to_string(),
                "kind": self.kind().as_str(),
            }),
        }
    }
}

impl From<GatewayError> for DispatchError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::RateLimited(_) => DispatchError::RateLimited,
            GatewayError::QuotaExceeded(_) => DispatchError::QuotaExceeded,
            GatewayError::Upstream { status, body } => DispatchError::Upstream {
                status,
                detail: body,
            },
            other => DispatchError::Internal(other.to_string()),
        }
    }
}

/// Successful dispatch result
pub enum DispatchResponse {
    /// Buffered-mode document
    Json(Value),
    /// Streaming-mode pass-through body
    Stream(ByteStream),
}

impl std::fmt::Debug for DispatchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispatchResponse::Json(value) => f.debug_tuple("Json").field(value).finish(),
            DispatchResponse::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Remove an enclosing triple-backtick fence with an optional `json` tag
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    match rest.strip_suffix("```") {
        Some(body) => body.strip_suffix('\n').unwrap_or(body),
        None => rest,
    }
}

/// Shape a buffered completion for its mode
pub fn shape_buffered(mode: Mode, text: &str) -> Result<Value, DispatchError> {
    match mode {
        Mode::Quiz => serde_json::from_str::<Value>(strip_code_fence(text)).map_err(|e| {
            let preview: String = text.chars().take(QUIZ_LOG_PREVIEW_CHARS).collect();
            error!("Failed to parse quiz JSON: {}, content: {}", e, preview);
            DispatchError::MalformedUpstreamPayload {
                raw: text.to_string(),
            }
        }),
        Mode::Notes => Ok(json!({ "notes": text })),
        Mode::Planner => Ok(json!({ "plan": text })),
        Mode::Simple | Mode::StepByStep | Mode::RealWorld | Mode::Problem => {
            Err(DispatchError::Internal(format!(
                "Mode {} does not produce a buffered response",
                mode
            )))
        }
    }
}

/// Dispatches study requests to the gateway
pub struct Dispatcher {
    gateway: Arc<dyn Gateway>,
    model: String,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn Gateway>, model: impl Into<String>) -> Self {
        Self {
            gateway,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn gateway_name(&self) -> &str {
        self.gateway.gateway_name()
    }

    /// Handle one request end to end
    pub async fn handle(&self, request: ChatRequest) -> Result<DispatchResponse, DispatchError> {
        let request_id = uuid::Uuid::new_v4();
        let mode = request.mode;
        let shape = mode.shape();
        info!(
            %request_id,
            %mode,
            messages = request.messages.len(),
            "Dispatching study request"
        );

        let system_prompt = prompts::resolve_for(&request);
        let upstream = build_request(
            &self.model,
            &system_prompt,
            &request.messages,
            shape == ResponseShape::Streaming,
        );

        let completion = self.gateway.complete(upstream).await.map_err(|e| {
            warn!(%request_id, %mode, "Gateway call failed: {}", e);
            DispatchError::from(e)
        })?;

        match (shape, completion) {
            (ResponseShape::Buffered, Completion::Buffered(response)) => {
                let text = response.text();
                info!(%request_id, %mode, length = text.len(), "AI response received");
                shape_buffered(mode, text).map(DispatchResponse::Json)
            }
            (ResponseShape::Streaming, Completion::Stream(stream)) => {
                Ok(DispatchResponse::Stream(stream))
            }
            (expected, _) => Err(DispatchError::Internal(format!(
                "Gateway returned the wrong completion kind for {:?} mode {}",
                expected, mode
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::study::{Message, QuestionType};
    use crate::models::upstream::{
        ChoiceMessage, CompletionChoice, CompletionRequest, CompletionResponse,
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::sync::Mutex;

    /// Gateway double that records requests and replays a canned outcome
    struct FakeGateway {
        text: String,
        status: Option<u16>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl FakeGateway {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                text: text.to_string(),
                status: None,
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                text: "upstream said no".to_string(),
                status: Some(status),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Gateway for FakeGateway {
        async fn complete(&self, request: CompletionRequest) -> Result<Completion, GatewayError> {
            let stream = request.stream;
            self.seen.lock().unwrap().push(request);
            if let Some(status) = self.status {
                return Err(crate::core::gateway::classify_status(
                    reqwest::StatusCode::from_u16(status).unwrap(),
                    self.text.clone(),
                ));
            }
            if stream {
                let chunks: Vec<Result<Bytes, GatewayError>> = vec![Ok(Bytes::from(self.text.clone()))];
                return Ok(Completion::Stream(Box::pin(futures::stream::iter(chunks))));
            }
            Ok(Completion::Buffered(CompletionResponse {
                choices: vec![CompletionChoice {
                    message: Some(ChoiceMessage {
                        role: Some("assistant".to_string()),
                        content: Some(self.text.clone()),
                    }),
                    finish_reason: Some("stop".to_string()),
                }],
                ..Default::default()
            }))
        }

        fn gateway_name(&self) -> &str {
            "fake"
        }
    }

    fn request(mode: Mode) -> ChatRequest {
        ChatRequest::new(mode, vec![Message::user("Explain tries")])
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  ```\n[1]\n```  "), "[1]");
        assert_eq!(strip_code_fence("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```json{\"a\":1}"), "{\"a\":1}");
    }

    #[tokio::test]
    async fn test_quiz_fenced_json() {
        let gateway = FakeGateway::replying(
            "```json\n{\"questions\":[{\"question\":\"Q\",\"type\":\"short\",\"correct_answer\":\"x\",\"explanation\":\"e\"}]}\n```",
        );
        let dispatcher = Dispatcher::new(gateway.clone(), "test-model");
        let mut req = request(Mode::Quiz);
        req.question_type = Some(QuestionType::Short);

        let response = dispatcher.handle(req).await.unwrap();
        let DispatchResponse::Json(value) = response else {
            panic!("expected JSON response");
        };
        assert_eq!(value["questions"][0]["question"], "Q");

        let seen = gateway.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].stream);
        assert_eq!(seen[0].model, "test-model");
        assert!(seen[0].messages[0].content.contains("\"type\":\"short\""));
    }

    #[tokio::test]
    async fn test_quiz_not_json() {
        let dispatcher = Dispatcher::new(FakeGateway::replying("not json"), "m");
        let err = dispatcher.handle(request(Mode::Quiz)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedUpstreamPayload);
        assert_eq!(err.kind().http_status(), 500);
        let body = err.to_body();
        assert_eq!(body["raw"], "not json");
        assert_eq!(body["error"], "Failed to generate questions");
    }

    #[tokio::test]
    async fn test_notes_identity() {
        let text = "# Heaps\n- complete binary tree\n";
        let dispatcher = Dispatcher::new(FakeGateway::replying(text), "m");
        let DispatchResponse::Json(value) = dispatcher.handle(request(Mode::Notes)).await.unwrap()
        else {
            panic!("expected JSON response");
        };
        assert_eq!(value, json!({ "notes": text }));
    }

    #[tokio::test]
    async fn test_planner_wraps_plan() {
        let dispatcher = Dispatcher::new(FakeGateway::replying("| Day | Topic |"), "m");
        let DispatchResponse::Json(value) =
            dispatcher.handle(request(Mode::Planner)).await.unwrap()
        else {
            panic!("expected JSON response");
        };
        assert_eq!(value, json!({ "plan": "| Day | Topic |" }));
    }

    #[tokio::test]
    async fn test_streaming_pass_through() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n";
        let gateway = FakeGateway::replying(body);
        let dispatcher = Dispatcher::new(gateway.clone(), "m");
        let DispatchResponse::Stream(mut stream) =
            dispatcher.handle(request(Mode::StepByStep)).await.unwrap()
        else {
            panic!("expected stream response");
        };
        let mut collected = Vec::new();
        while let Some(chunk) = stream.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(collected, body.as_bytes());
        assert!(gateway.seen.lock().unwrap()[0].stream);
    }

    #[tokio::test]
    async fn test_gateway_errors_map_to_taxonomy() {
        for (status, kind) in [
            (429, ErrorKind::RateLimited),
            (402, ErrorKind::QuotaExceeded),
            (503, ErrorKind::UpstreamError),
        ] {
            let dispatcher = Dispatcher::new(FakeGateway::failing(status), "m");
            let err = dispatcher.handle(request(Mode::Simple)).await.unwrap_err();
            assert_eq!(err.kind(), kind);
        }
    }

    #[test]
    fn test_missing_credential_is_internal() {
        let err = DispatchError::from(GatewayError::MissingCredential("LOVABLE_API_KEY".into()));
        assert_eq!(err.kind(), ErrorKind::InternalError);
        assert_eq!(err.to_body()["error"], "LOVABLE_API_KEY not configured");
    }
}
