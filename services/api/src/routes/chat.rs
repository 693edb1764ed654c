use super::{forwarded_status, parse_body};
use crate::AppState;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use deck_live_core::answer::{MISSING_KEY, answer_question};
use deck_live_core::chat::{ChatReply, ChatRequest};
use deck_live_core::context::ContextAssembler;
use deck_live_core::remote::RemoteError;
use deck_live_core::slides::load_deck_facts;
use std::sync::Arc;

pub const MISSING_MESSAGE: &str = "Missing message";

/// Handler for `POST /api/chat`.
pub async fn chat(State(state): State<Arc<AppState>>, body: Bytes) -> (StatusCode, Json<ChatReply>) {
    let Some(service) = state.answer.clone() else {
        return (StatusCode::OK, Json(ChatReply::failed(MISSING_KEY)));
    };

    let request: ChatRequest = match parse_body(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Rejecting chat body: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatReply::failed(&e.to_string())),
            );
        }
    };
    if request.question_text().is_empty() {
        return (StatusCode::OK, Json(ChatReply::failed(MISSING_MESSAGE)));
    }

    let facts = load_deck_facts(&state.facts_candidates);
    let assembler = ContextAssembler::for_deck(state.deck_title.as_deref(), &facts);

    match answer_question(service.as_ref(), &facts, &request, &assembler).await {
        Ok(answer) => {
            tracing::info!("Answered question ({} chars)", answer.len());
            (StatusCode::OK, Json(ChatReply::answered(&answer)))
        }
        Err(RemoteError::Api {
            status,
            message,
            raw,
        }) => {
            tracing::warn!("Answer provider returned {}: {}", status, message);
            (
                forwarded_status(status),
                Json(ChatReply::failed(&message).with_raw(raw)),
            )
        }
        Err(e) => {
            tracing::error!("Answer request failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatReply::failed(&e.message())),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use crate::{AppState, router};
    use axum::http::StatusCode;
    use deck_live_core::remote::RemoteError;
    use serde_json::json;
    use std::io::Write;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn facts_file() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({
                "title": "Nordlys 2029",
                "slides": [
                    {"key": "intro", "name": "Intro", "script": "Welcome", "text": "Our journey"},
                    {"key": "year_2027", "name": "2027", "script": "Sales reach 48 MEUR", "text": "Export growth in 2027"}
                ]
            })
        )
        .unwrap();
        file
    }

    #[tokio::test]
    async fn missing_key_wins_over_a_broken_body() {
        let app = router(Arc::new(AppState::new(vec![])));

        let response = app.oneshot(post_json("/api/chat", "not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"ok": false, "error": "OPENAI_API_KEY not set"})
        );
    }

    #[tokio::test]
    async fn broken_body_is_a_server_error() {
        let state = AppState::new(vec![])
            .with_answer_service(Arc::new(FakeAnswer::new(|| Ok("unused".into()))));
        let app = router(Arc::new(state));

        let response = app.oneshot(post_json("/api/chat", "{\"question\":")).await.unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["ok"], false);
    }

    #[tokio::test]
    async fn empty_question_is_reported() {
        let state = AppState::new(vec![])
            .with_answer_service(Arc::new(FakeAnswer::new(|| Ok("unused".into()))));
        let app = router(Arc::new(state));

        for body in ["", "{}", "{\"message\":\"   \"}"] {
            let response = app.clone().oneshot(post_json("/api/chat", body)).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            assert_eq!(
                body_json(response).await,
                json!({"ok": false, "error": "Missing message"})
            );
        }
    }

    #[tokio::test]
    async fn numeric_message_is_answered() {
        let answer = Arc::new(FakeAnswer::new(|| Ok("The answer is 42.".into())));
        let state = AppState::new(vec![]).with_answer_service(answer.clone());
        let app = router(Arc::new(state));

        let response = app
            .oneshot(post_json("/api/chat", "{\"message\":42}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["ok"], true);
        assert_eq!(answer.seen.lock().unwrap()[0].1, "42");
    }

    #[tokio::test]
    async fn answers_with_deck_context() {
        // Arrange
        let facts = facts_file();
        let answer = Arc::new(FakeAnswer::new(|| Ok("Sales are 48 MEUR.".into())));
        let state = AppState::new(vec![facts.path().to_path_buf()])
            .with_answer_service(answer.clone());
        let app = router(Arc::new(state));
        let body = json!({
            "message": "What are sales in 2027?",
            "currentSlideKey": "year_2027",
            "currentSlideName": "2027"
        });

        // Act
        let response = app
            .oneshot(post_json("/api/chat", &body.to_string()))
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"ok": true, "answer": "Sales are 48 MEUR."})
        );
        let seen = answer.seen.lock().unwrap();
        let (instructions, question) = &seen[0];
        assert_eq!(question, "What are sales in 2027?");
        assert!(instructions.contains("\"Nordlys 2029\""));
        assert!(instructions.contains("Current slide on screen: year_2027 (2027)"));
        assert!(instructions.contains("Sales reach 48 MEUR"));
    }

    #[tokio::test]
    async fn upstream_status_is_forwarded() {
        let state = AppState::new(vec![]).with_answer_service(Arc::new(FakeAnswer::new(|| {
            Err(RemoteError::Api {
                status: 429,
                message: "Rate limit reached".into(),
                raw: Some(json!({"error": {"message": "Rate limit reached"}})),
            })
        })));
        let app = router(Arc::new(state));

        let response = app
            .oneshot(post_json("/api/chat", "{\"question\":\"hi\"}"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            body_json(response).await,
            json!({
                "ok": false,
                "error": "Rate limit reached",
                "raw": {"error": {"message": "Rate limit reached"}}
            })
        );
    }
}
