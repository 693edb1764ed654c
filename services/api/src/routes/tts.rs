use super::{forwarded_status, parse_body};
use crate::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use deck_live_core::answer::MISSING_KEY;
use deck_live_core::remote::{TtsReply, TtsRequest};
use std::sync::Arc;

pub const MISSING_TEXT: &str = "Missing text";

fn failed(status: StatusCode, error: &str) -> Response {
    (status, Json(TtsReply::failed(error))).into_response()
}

/// Handler for `POST /api/tts`. Returns raw audio unless the caller asked for
/// base64, in which case the audio is wrapped in a JSON body.
pub async fn tts(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let Some(service) = state.speech.clone() else {
        return failed(StatusCode::OK, MISSING_KEY);
    };

    let request: TtsRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejecting tts body: {}", e);
            return failed(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
    };
    if request.text().is_empty() {
        return failed(StatusCode::OK, MISSING_TEXT);
    }
    let speech = match request.to_speech_request(&state.default_voice) {
        Ok(speech) => speech,
        Err(e) => return failed(StatusCode::OK, &e),
    };

    match service.synthesize(&speech).await {
        Ok(audio) => {
            tracing::info!(
                "Synthesized {} bytes of {}",
                audio.bytes.len(),
                audio.content_type()
            );
            if request.wants_base64() {
                Json(TtsReply::audio(&audio)).into_response()
            } else {
                ([(header::CONTENT_TYPE, audio.content_type())], audio.bytes).into_response()
            }
        }
        Err(e) => {
            tracing::warn!("Speech request failed: {}", e);
            failed(forwarded_status(e.status()), &e.message())
        }
    }
}
