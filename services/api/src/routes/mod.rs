pub mod chat;
pub mod tts;

use crate::AppState;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

pub async fn healthz(State(state): State<Arc<AppState>>) -> Json<Value> {
    Json(json!({ "ok": true, "configured": state.is_configured() }))
}

/// Parses a JSON body, treating an empty one as `{}`.
pub(crate) fn parse_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
}

/// Maps an upstream status onto ours, falling back to 500 for anything axum
/// cannot represent.
pub(crate) fn forwarded_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
