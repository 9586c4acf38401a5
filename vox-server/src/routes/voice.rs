//! Voice-facing endpoints under `/v1`.
//!
//! Each handler maps one voice intent onto the dispatcher and answers with a
//! [`RenderedAnswer`].

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use validator::Validate;
use vox_types::RenderedAnswer;

use crate::error::ServerError;
use crate::middleware::trace::TraceId;
use crate::schemas::{
    ImageRequest, PromptRequest, SelectModelRequest, SystemPromptRequest, TranslateRequest,
};
use crate::state::AppState;

type Answer = Result<Json<RenderedAnswer>, ServerError>;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/prompt", post(prompt))
        .route("/image", post(image))
        .route("/translate", post(translate))
        .route("/fact", post(random_fact))
        .route("/response", get(last_response))
        .route("/system-prompt", post(set_system_prompt).delete(clear_system_prompt))
        .route("/models", get(list_models).put(select_model))
        .route("/queue/purge", post(purge))
}

// ── generation ───────────────────────────────────────────────────────────────

async fn prompt(
    State(state): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    payload: Result<Json<PromptRequest>, JsonRejection>,
) -> Answer {
    let req = validated(payload)?;
    let answer = state
        .dispatcher
        .dispatch_prompt(&req.prompt, req.illustrate, &trace_id.to_string())
        .await?;
    Ok(Json(answer))
}

async fn image(
    State(state): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    payload: Result<Json<ImageRequest>, JsonRejection>,
) -> Answer {
    let req = validated(payload)?;
    let answer = state
        .dispatcher
        .dispatch_image(&req.prompt, &trace_id.to_string())
        .await?;
    Ok(Json(answer))
}

async fn translate(
    State(state): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
    payload: Result<Json<TranslateRequest>, JsonRejection>,
) -> Answer {
    let req = validated(payload)?;
    let answer = state
        .dispatcher
        .dispatch_translation(
            &req.prompt,
            req.source_language,
            req.target_language,
            &trace_id.to_string(),
        )
        .await?;
    Ok(Json(answer))
}

async fn random_fact(
    State(state): State<Arc<AppState>>,
    Extension(TraceId(trace_id)): Extension<TraceId>,
) -> Answer {
    Ok(Json(state.dispatcher.random_fact(&trace_id.to_string()).await?))
}

async fn last_response(State(state): State<Arc<AppState>>) -> Answer {
    Ok(Json(state.dispatcher.last_response().await?))
}

// ── session ──────────────────────────────────────────────────────────────────

async fn set_system_prompt(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SystemPromptRequest>, JsonRejection>,
) -> Answer {
    let req = validated(payload)?;
    Ok(Json(state.dispatcher.set_system_prompt(&req.system_prompt).await))
}

async fn clear_system_prompt(State(state): State<Arc<AppState>>) -> Json<RenderedAnswer> {
    Json(state.dispatcher.clear_system_prompt().await)
}

async fn list_models(State(state): State<Arc<AppState>>) -> Json<RenderedAnswer> {
    Json(RenderedAnswer::new("Models", state.dispatcher.models_help()))
}

async fn select_model(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SelectModelRequest>, JsonRejection>,
) -> Answer {
    let req = validated(payload)?;
    Ok(Json(state.dispatcher.select_model(&req.alias).await))
}

/// Success is silent.
async fn purge(State(state): State<Arc<AppState>>) -> Result<StatusCode, ServerError> {
    state.dispatcher.purge().await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn validated<T: Validate>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    let Json(body) = payload.map_err(|e| ServerError::BadRequest(e.body_text()))?;
    body.validate()
        .map_err(|e| ServerError::BadRequest(e.to_string()))?;
    Ok(body)
}
