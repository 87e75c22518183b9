//! Client for the study endpoint
//!
//! Streams explanations through the chunk parser and wraps the buffered quiz,
//! notes and planner modes in typed calls.

use crate::client::parser::{self, ParserLimits, StreamHandler};
use crate::core::error::ErrorKind;
use crate::models::study::{
    ChatRequest, Difficulty, Message, Mode, PlanRequest, QuestionType, QuizSet, Role,
};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::io::Write;
use thiserror::Error;
use tracing::{debug, warn};

const RATE_LIMITED_MESSAGE: &str = "Too many requests. Please wait a moment and try again.";
const QUOTA_EXCEEDED_MESSAGE: &str = "AI usage limit reached. Please try again later.";
const GENERIC_FAILURE_MESSAGE: &str = "Failed to get AI response";
const MISSING_BODY_MESSAGE: &str = "No response body";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{message}")]
    Api { kind: ErrorKind, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::Api { kind, .. } => *kind,
            ClientError::Transport(_) | ClientError::Decode(_) => ErrorKind::InternalError,
        }
    }
}

/// User-displayable message for a failed request
pub fn error_for_status(status: StatusCode, body: &str) -> ClientError {
    match status.as_u16() {
        429 => ClientError::Api {
            kind: ErrorKind::RateLimited,
            message: RATE_LIMITED_MESSAGE.to_string(),
        },
        402 => ClientError::Api {
            kind: ErrorKind::QuotaExceeded,
            message: QUOTA_EXCEEDED_MESSAGE.to_string(),
        },
        _ => ClientError::Api {
            kind: ErrorKind::UpstreamError,
            message: if body.trim().is_empty() {
                GENERIC_FAILURE_MESSAGE.to_string()
            } else {
                body.to_string()
            },
        },
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NotesBody {
    notes: String,
}

#[derive(Debug, Deserialize)]
struct PlanBody {
    plan: String,
}

/// Accumulates a streamed reply into the conversation
///
/// The first delta appends an assistant message; later deltas extend it.
pub struct AssistantReply<'a> {
    messages: &'a mut Vec<Message>,
    started: bool,
    echo: bool,
    error: Option<String>,
    done: bool,
}

impl<'a> AssistantReply<'a> {
    pub fn new(messages: &'a mut Vec<Message>) -> Self {
        Self {
            messages,
            started: false,
            echo: false,
            error: None,
            done: false,
        }
    }

    /// Also print each delta to stdout as it arrives
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }
}

impl StreamHandler for AssistantReply<'_> {
    fn on_delta(&mut self, text: &str) {
        if !self.started {
            self.messages.push(Message::assistant(""));
            self.started = true;
        }
        if let Some(last) = self.messages.last_mut().filter(|m| m.role == Role::Assistant) {
            last.content.push_str(text);
        }
        if self.echo {
            echo_delta(&mut std::io::stdout().lock(), text);
        }
    }

    fn on_done(&mut self) {
        self.done = true;
    }

    fn on_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }
}

/// Write a delta as it arrives; a closed output does not end the session
fn echo_delta<W: Write>(out: &mut W, text: &str) -> bool {
    match out.write_all(text.as_bytes()).and_then(|_| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            debug!("Failed to echo delta: {}", e);
            false
        }
    }
}

/// HTTP client for the study endpoint
pub struct StudyClient {
    http: Client,
    endpoint: String,
    publishable_key: Option<String>,
    limits: ParserLimits,
}

impl StudyClient {
    pub fn new(endpoint: impl Into<String>, publishable_key: Option<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            publishable_key,
            limits: ParserLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: ParserLimits) -> Self {
        self.limits = limits;
        self
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, ClientError> {
        let mut builder = self.http.post(&self.endpoint).json(request);
        if let Some(key) = &self.publishable_key {
            builder = builder.bearer_auth(key);
        }
        builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))
    }

    /// Stream a reply, reporting progress through `handler`
    ///
    /// Exactly one of `on_done` / `on_error` is called.
    pub async fn stream_chat<H: StreamHandler + ?Sized>(&self, request: &ChatRequest, handler: &mut H) {
        let response = match self.post(request).await {
            Ok(response) => response,
            Err(e) => {
                handler.on_error(&e.to_string());
                return;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Study endpoint returned {}: {}", status.as_u16(), body);
            handler.on_error(&error_for_status(status, &body).to_string());
            return;
        }

        if response.content_length() == Some(0) {
            handler.on_error(MISSING_BODY_MESSAGE);
            return;
        }

        debug!("Streaming {} reply", request.mode);
        parser::parse(response.bytes_stream(), self.limits, handler).await;
    }

    async fn buffered<T: DeserializeOwned>(&self, request: &ChatRequest) -> Result<T, ClientError> {
        let response = self.post(request).await?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        if !status.is_success() {
            let Ok(parsed) = serde_json::from_str::<ErrorBody>(&body) else {
                return Err(error_for_status(status, &body));
            };
            let err = error_for_status(status, &parsed.error);
            return Err(match (err, parsed.kind.as_deref().and_then(ErrorKind::from_tag)) {
                (ClientError::Api { message, .. }, Some(kind)) => ClientError::Api { kind, message },
                (err, _) => err,
            });
        }

        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Generate a five-question quiz
    pub async fn generate_quiz(
        &self,
        subject: &str,
        topic: &str,
        difficulty: Difficulty,
        question_type: QuestionType,
    ) -> Result<QuizSet, ClientError> {
        let request = ChatRequest {
            messages: vec![Message::user(format!("Generate quiz for {topic}"))],
            mode: Mode::Quiz,
            subject: Some(subject.to_string()),
            topic: Some(topic.to_string()),
            difficulty: Some(difficulty),
            question_type: Some(question_type),
        };
        self.buffered(&request).await
    }

    /// Turn raw study material into notes
    pub async fn generate_notes(&self, text: &str) -> Result<String, ClientError> {
        let request = ChatRequest::new(Mode::Notes, vec![Message::user(text)]);
        self.buffered::<NotesBody>(&request).await.map(|b| b.notes)
    }

    /// Build a study plan
    pub async fn generate_plan(&self, plan: &PlanRequest) -> Result<String, ClientError> {
        let request = ChatRequest::new(Mode::Planner, vec![plan.to_message()]);
        self.buffered::<PlanBody>(&request).await.map(|b| b.plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode as HttpStatus;
    use axum::http::header::CONTENT_TYPE;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::json;

    #[test]
    fn test_status_messages() {
        assert_eq!(
            error_for_status(StatusCode::TOO_MANY_REQUESTS, "").to_string(),
            RATE_LIMITED_MESSAGE
        );
        assert_eq!(
            error_for_status(StatusCode::PAYMENT_REQUIRED, "{}").kind(),
            ErrorKind::QuotaExceeded
        );
        assert_eq!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "").to_string(),
            GENERIC_FAILURE_MESSAGE
        );
        assert_eq!(
            error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "AI error").to_string(),
            "AI error"
        );
    }

    #[test]
    fn test_assistant_reply_grows_last_message() {
        let mut messages = vec![Message::user("What is a B-tree?")];
        {
            let mut reply = AssistantReply::new(&mut messages);
            reply.on_delta("A balanced ");
            reply.on_delta("search tree.");
            reply.on_done();
            assert!(reply.is_done());
            assert!(reply.error().is_none());
        }
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], Message::assistant("A balanced search tree."));
    }

    #[test]
    fn test_assistant_reply_error_without_deltas() {
        let mut messages = vec![Message::user("hi")];
        let mut reply = AssistantReply::new(&mut messages);
        reply.on_error(RATE_LIMITED_MESSAGE);
        assert_eq!(reply.error(), Some(RATE_LIMITED_MESSAGE));
        assert!(!reply.is_done());
        drop(reply);
        assert_eq!(messages.len(), 1);
    }

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::ErrorKind::BrokenPipe.into())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_echo_failure_is_reported_not_fatal() {
        let mut written = Vec::new();
        assert!(echo_delta(&mut written, "heap"));
        assert_eq!(written, b"heap");
        assert!(!echo_delta(&mut ClosedPipe, "heap"));
    }

    /// Serve `router` on an ephemeral local port and return its study URL
    async fn spawn_endpoint(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/study-ai")
    }

    fn hello() -> ChatRequest {
        ChatRequest::new(Mode::Simple, vec![Message::user("What is a queue?")])
    }

    #[tokio::test]
    async fn test_rate_limited_reports_single_error() {
        let endpoint = spawn_endpoint(Router::new().route(
            "/study-ai",
            post(|| async {
                (
                    HttpStatus::TOO_MANY_REQUESTS,
                    Json(json!({ "error": "Rate limited", "kind": "rate_limited" })),
                )
            }),
        ))
        .await;

        let mut events: Vec<parser::StreamEvent> = Vec::new();
        StudyClient::new(endpoint, None)
            .stream_chat(&hello(), &mut events)
            .await;
        assert_eq!(
            events,
            vec![parser::StreamEvent::Error(RATE_LIMITED_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_is_missing_body() {
        let endpoint =
            spawn_endpoint(Router::new().route("/study-ai", post(|| async { "" }))).await;

        let mut events: Vec<parser::StreamEvent> = Vec::new();
        StudyClient::new(endpoint, None)
            .stream_chat(&hello(), &mut events)
            .await;
        assert_eq!(
            events,
            vec![parser::StreamEvent::Error(MISSING_BODY_MESSAGE.to_string())]
        );
    }

    #[tokio::test]
    async fn test_streamed_reply_builds_assistant_message() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"First in, \"}}]}\n\n\
                    : keep-alive\n\n\
                    data: {\"choices\":[{\"delta\":{\"content\":\"first out.\"}}]}\n\n\
                    data: [DONE]\n\n";
        let endpoint = spawn_endpoint(Router::new().route(
            "/study-ai",
            post(move || async move { ([(CONTENT_TYPE, "text/event-stream")], body) }),
        ))
        .await;

        let request = hello();
        let mut messages = request.messages.clone();
        let mut reply = AssistantReply::new(&mut messages);
        StudyClient::new(endpoint, Some("anon-key".to_string()))
            .stream_chat(&request, &mut reply)
            .await;
        assert!(reply.is_done());
        assert!(reply.error().is_none());
        drop(reply);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1], Message::assistant("First in, first out."));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_reports_error() {
        let client = StudyClient::new("http://127.0.0.1:9/study-ai", None);
        let mut events: Vec<parser::StreamEvent> = Vec::new();
        client
            .stream_chat(&ChatRequest::new(Mode::Simple, vec![Message::user("hi")]), &mut events)
            .await;
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], parser::StreamEvent::Error(_)));
    }
}
