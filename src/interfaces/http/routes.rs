use std::sync::Arc;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use super::AppState;
use crate::application::relay::CallbackRequest;
use crate::application::verify::{VerifyRequest, verify_access_token};
use crate::error::RelayError;

/// `POST /api/pi`: bare status code, empty body on success.
pub async fn payment_callback_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CallbackRequest>, JsonRejection>,
) -> Result<StatusCode, RelayError> {
    let Json(request) = payload.map_err(|e| RelayError::BadRequest(e.body_text()))?;
    state.relay.handle(request).await?;
    Ok(StatusCode::OK)
}

/// `POST /api/verify`: JSON in both directions.
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(e) => return RelayError::BadRequest(e.body_text()).into_response(),
    };

    match verify_access_token(state.relay.authority(), request).await {
        Ok(verification) => (StatusCode::OK, Json(verification)).into_response(),
        Err(RelayError::Unauthorized(message)) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "ok": false, "error": message })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}
