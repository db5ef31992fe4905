mod personas;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use persona_collector::CollectorError;
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, PersonaRateLimiter, RequestId, REQUEST_ID_HEADER,
};
use crate::pipeline::{PersonaService, PipelineError, SynthesisError};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PersonaService>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Error body: `error` is the human-readable message, `code` the stable
/// machine-readable kind that also selects the HTTP status.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub success: bool,
    pub error: String,
    pub code: String,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
struct HealthData {
    status: &'static str,
    providers: Vec<String>,
    cached_personas: usize,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn ok(data: T, request_id: String) -> Self {
        Self {
            success: true,
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: code.into(),
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "invalid_username" | "bad_request" => StatusCode::BAD_REQUEST,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_pipeline_error(request_id: String, error: &PipelineError) -> ApiError {
    match error {
        PipelineError::InvalidUsername(_) => {
            ApiError::new(request_id, "invalid_username", error.to_string())
        }
        PipelineError::Collection(CollectorError::NotFound { .. }) => {
            ApiError::new(request_id, "not_found", error.to_string())
        }
        PipelineError::Collection(CollectorError::RateLimited { .. }) => {
            ApiError::new(request_id, "rate_limited", error.to_string())
        }
        PipelineError::Collection(e) => {
            tracing::error!(error = %e, "activity collection failed");
            ApiError::new(request_id, "upstream_error", "failed to collect reddit activity")
        }
        PipelineError::Closed => {
            tracing::error!(error = %error, "synthesis unavailable");
            ApiError::new(request_id, "internal_error", "synthesis unavailable")
        }
    }
}

pub(super) fn map_synthesis_error(request_id: String, error: &SynthesisError) -> ApiError {
    match error {
        SynthesisError::Synthesis(e) => map_pipeline_error(request_id, e),
        SynthesisError::Aborted(reason) => {
            tracing::error!(reason = %reason, "synthesis task aborted");
            ApiError::new(request_id, "internal_error", "persona synthesis failed")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
        .expose_headers([header::RETRY_AFTER, HeaderName::from_static(REQUEST_ID_HEADER)])
}

fn persona_router(limiter: PersonaRateLimiter) -> Router<AppState> {
    Router::new()
        .route("/api/v1/personas", post(personas::create_persona))
        .route(
            "/api/v1/personas/{username}",
            get(personas::get_persona).delete(personas::invalidate_persona),
        )
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            enforce_rate_limit,
        ))
}

pub fn build_app(state: AppState, limiter: PersonaRateLimiter) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(persona_router(limiter))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let data = HealthData {
        status: "ok",
        providers: state.service.provider_ids(),
        cached_personas: state.service.cache().len().await,
    };
    (StatusCode::OK, Json(ApiResponse::ok(data, req_id.0)))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
