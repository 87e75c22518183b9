//! API endpoint handlers
//!
//! This module implements the HTTP surface of the study proxy: the mode
//! dispatch endpoint, CORS handling, health and catalog endpoints.

use crate::core::config::Config;
use crate::core::constants::{cors, sse};
use crate::core::dispatcher::{DispatchError, DispatchResponse, Dispatcher};
use crate::core::subjects::SUBJECTS;
use crate::models::study::ChatRequest;
use axum::{
    Json, Router,
    body::Body,
    extract::{Request, State, rejection::JsonRejection},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_ORIGIN, CACHE_CONTROL,
            CONTENT_TYPE,
        },
    },
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

/// Paths the dispatch endpoint is mounted at
pub const STUDY_AI_PATHS: [&str; 2] = ["/study-ai", "/functions/v1/study-ai"];

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
    pub api_key_configured: bool,
}

/// Create the API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/subjects", get(list_subjects));

    for path in STUDY_AI_PATHS {
        router = router.route(path, post(study_ai));
    }

    router
        .fallback(not_found)
        .layer(middleware::from_fn(cors_layer))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(cors::ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(cors::ALLOW_HEADERS),
    );
}

/// Answer preflights with a bare `ok` and stamp CORS headers on everything
async fn cors_layer(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        "ok".into_response()
    } else {
        next.run(request).await
    };
    apply_cors(response.headers_mut());
    response
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.kind().http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_body())).into_response()
    }
}

/// POST /study-ai - Dispatch a study request by mode
async fn study_ai(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!("Rejected study request body: {}", rejection.body_text());
            return DispatchError::Internal(rejection.body_text()).into_response();
        }
    };

    match state.dispatcher.handle(request).await {
        Ok(DispatchResponse::Json(body)) => Json(body).into_response(),
        Ok(DispatchResponse::Stream(stream)) => {
            let mut response = Response::new(Body::from_stream(stream));
            let headers = response.headers_mut();
            headers.insert(CONTENT_TYPE, HeaderValue::from_static(sse::CONTENT_TYPE));
            headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
            response
        }
        Err(e) => {
            error!("study-ai error: {} ({})", e, e.kind());
            e.into_response()
        }
    }
}

/// GET / - Root endpoint
async fn root(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "message": "Study AI Proxy v0.1.0",
        "status": "running",
        "config": {
            "gateway": state.dispatcher.gateway_name(),
            "model": state.dispatcher.model(),
            "api_key_configured": state.api_key_configured,
        },
        "endpoints": {
            "study_ai": STUDY_AI_PATHS[0],
            "subjects": "/subjects",
            "health": "/health",
        },
    }))
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "api_key_configured": state.api_key_configured,
        "api_key_env": state.config.gateway.api_key_env,
    }))
}

/// GET /subjects - Subject and topic catalog
async fn list_subjects() -> impl IntoResponse {
    Json(json!({ "subjects": SUBJECTS }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}
