use axum::{
    extract::{Path, State},
    Extension, Json,
};
use persona_core::{ChartAggregate, FeatureProfile, PersonaRecord, ProviderAttempt};
use persona_store::{CacheEntry, StoredPersona};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;
use crate::pipeline::{Limits, PersonaService};

use super::{map_pipeline_error, map_synthesis_error, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct CreatePersonaRequest {
    pub username: String,
    #[serde(default)]
    pub max_posts: Option<usize>,
    #[serde(default)]
    pub max_comments: Option<usize>,
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Debug, Serialize)]
pub(super) struct PersonaResponse {
    pub success: bool,
    pub persona: PersonaRecord,
    pub chart_data: Vec<ChartAggregate>,
    pub attempts: Vec<ProviderAttempt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<FeatureProfile>,
    pub meta: ResponseMeta,
}

impl PersonaResponse {
    fn from_entry(entry: &CacheEntry, request_id: String) -> Self {
        Self {
            success: true,
            persona: entry.record.clone(),
            chart_data: entry.charts.clone(),
            attempts: entry.attempts.clone(),
            profile: Some(entry.profile.clone()),
            meta: ResponseMeta::new(request_id),
        }
    }

    fn from_stored(stored: StoredPersona, request_id: String) -> Self {
        Self {
            success: true,
            persona: stored.persona,
            chart_data: stored.chart_data,
            attempts: stored.attempts,
            profile: None,
            meta: ResponseMeta::new(request_id),
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct InvalidateData {
    pub username: String,
    pub invalidated: bool,
}

pub(super) async fn create_persona(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreatePersonaRequest>,
) -> Result<Json<PersonaResponse>, ApiError> {
    let username = PersonaService::resolve_username(&body.username)
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;
    let limits = Limits {
        max_posts: body.max_posts,
        max_comments: body.max_comments,
    };

    let entry = state
        .service
        .persona(&username, limits, body.refresh)
        .await
        .map_err(|e| map_synthesis_error(req_id.0.clone(), &e))?;

    Ok(Json(PersonaResponse::from_entry(&entry, req_id.0)))
}

pub(super) async fn get_persona(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> Result<Json<PersonaResponse>, ApiError> {
    let username = PersonaService::resolve_username(&username)
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;

    if let Some(entry) = state.service.cache().get(&username).await {
        return Ok(Json(PersonaResponse::from_entry(&entry, req_id.0)));
    }

    match state.service.store().read(&username).await {
        Ok(Some(stored)) => Ok(Json(PersonaResponse::from_stored(stored, req_id.0))),
        Ok(None) => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("no persona for u/{username}"),
        )),
        Err(e) => {
            tracing::error!(username = %username, error = %e, "failed to read stored persona");
            Err(ApiError::new(
                req_id.0,
                "internal_error",
                "failed to read stored persona",
            ))
        }
    }
}

pub(super) async fn invalidate_persona(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(username): Path<String>,
) -> Result<Json<ApiResponse<InvalidateData>>, ApiError> {
    let username = PersonaService::resolve_username(&username)
        .map_err(|e| map_pipeline_error(req_id.0.clone(), &e))?;
    let invalidated = state.service.cache().invalidate(&username).await;

    Ok(Json(ApiResponse::ok(
        InvalidateData {
            username,
            invalidated,
        },
        req_id.0,
    )))
}
