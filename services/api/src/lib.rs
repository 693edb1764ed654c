pub mod config;
pub mod routes;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, header};
use axum::routing::{get, post};
use config::Config;
use deck_live_core::remote::{AnswerService, SpeechService};
use deck_live_openai::types::Voice;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;

/// Shared, read-only state of the proxy.
///
/// The provider services are `None` when no credential is configured; the
/// handlers report that instead of failing at startup.
#[derive(Clone)]
pub struct AppState {
    pub answer: Option<Arc<dyn AnswerService>>,
    pub speech: Option<Arc<dyn SpeechService>>,
    pub facts_candidates: Vec<PathBuf>,
    pub deck_title: Option<String>,
    pub default_voice: Voice,
}

impl AppState {
    pub fn new(facts_candidates: Vec<PathBuf>) -> Self {
        Self {
            answer: None,
            speech: None,
            facts_candidates,
            deck_title: None,
            default_voice: Voice::default(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut state = Self::new(config.facts_candidates()).with_deck_title(config.deck_title.clone());
        state.default_voice = config.speech_voice.clone();
        if let Some(openai) = config.openai_config() {
            let client = Arc::new(deck_live_openai::Client::new(openai));
            state = state
                .with_answer_service(client.clone())
                .with_speech_service(client);
        }
        state
    }

    pub fn with_answer_service(mut self, service: Arc<dyn AnswerService>) -> Self {
        self.answer = Some(service);
        self
    }

    pub fn with_speech_service(mut self, service: Arc<dyn SpeechService>) -> Self {
        self.speech = Some(service);
        self
    }

    pub fn with_deck_title(mut self, title: Option<String>) -> Self {
        self.deck_title = title;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.answer.is_some() && self.speech.is_some()
    }
}

fn always(name: HeaderName, value: &'static str) -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(name, HeaderValue::from_static(value))
}

/// Builds the application router.
///
/// Every response, errors and preflights included, carries the permissive
/// CORS headers and `cache-control: no-store`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/api/chat",
            post(routes::chat::chat).options(routes::preflight),
        )
        .route("/api/tts", post(routes::tts::tts).options(routes::preflight))
        .route("/healthz", get(routes::healthz))
        .layer(always(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"))
        .layer(always(header::ACCESS_CONTROL_ALLOW_HEADERS, "content-type"))
        .layer(always(header::ACCESS_CONTROL_ALLOW_METHODS, "POST, OPTIONS"))
        .layer(always(header::CACHE_CONTROL, "no-store"))
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::json;
    use test_support::*;
    use tower::ServiceExt;

    fn assert_cors(headers: &axum::http::HeaderMap) {
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(headers["access-control-allow-headers"], "content-type");
        assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(headers["cache-control"], "no-store");
    }

    #[tokio::test]
    async fn preflight_is_no_content_with_cors() {
        let app = router(Arc::new(AppState::new(vec![])));
        for uri in ["/api/chat", "/api/tts"] {
            let request = Request::builder()
                .method(Method::OPTIONS)
                .uri(uri)
                .body(Body::empty())
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();

            assert_eq!(response.status(), StatusCode::NO_CONTENT);
            assert_cors(response.headers());
        }
    }

    #[tokio::test]
    async fn error_responses_carry_cors_headers() {
        let app = router(Arc::new(AppState::new(vec![])));
        let response = app.oneshot(post_json("/api/chat", "{")).await.unwrap();
        assert_cors(response.headers());
    }

    #[tokio::test]
    async fn healthz_reports_configuration() {
        let offline = router(Arc::new(AppState::new(vec![])));
        let response = offline
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"ok": true, "configured": false}));

        let state = AppState::new(vec![])
            .with_answer_service(Arc::new(FakeAnswer::new(|| Ok(String::new()))))
            .with_speech_service(Arc::new(FakeSpeech::new(None)));
        let response = router(Arc::new(state))
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!({"ok": true, "configured": true}));
    }
}
