//! Unified server error type.
//!
//! Voice-facing failures never carry internal detail: a bridge error is
//! logged in full and the caller hears a short apology. Only malformed
//! requests get a non-200 status.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use vox_core::BridgeError;
use vox_types::RenderedAnswer;

pub const APOLOGY_TITLE: &str = "error";
pub const APOLOGY_SPEECH: &str = "an error occurred when processing your prompt";

#[derive(Debug, Error)]
pub enum ServerError {
    /// Anything the bridge reported: queue, provider, serialization.
    #[error("bridge error: {0}")]
    Bridge(#[from] BridgeError),

    /// The caller sent an invalid or malformed request.
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        match self {
            ServerError::Bridge(e) => {
                error!(error = %e, "bridge error");
                let apology = RenderedAnswer::new(APOLOGY_TITLE, APOLOGY_SPEECH).ending_session();
                (StatusCode::OK, Json(apology)).into_response()
            }
            ServerError::BadRequest(m) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
            }
        }
    }
}
