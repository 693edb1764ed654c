//! Clients for a running `deck-live-api`.

use async_trait::async_trait;
use deck_live_core::chat::{ChatBackend, ChatError, ChatReply, ChatRequest};
use deck_live_core::remote::{
    BASE64_ENCODING, RemoteError, SpeechAudio, SpeechRequest, SpeechService, TtsReply, TtsRequest,
};

pub const CHAT_PATH: &str = "/api/chat";
pub const TTS_PATH: &str = "/api/tts";

/// Sends chat questions to `{endpoint}/api/chat`.
#[derive(Debug, Clone)]
pub struct HttpChatBackend {
    http: reqwest::Client,
    url: String,
}

impl HttpChatBackend {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", endpoint.trim_end_matches('/'), CHAT_PATH),
        }
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn ask(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(RemoteError::from)?;
        let status = response.status().as_u16();
        let reply: ChatReply = response.json().await.map_err(RemoteError::from)?;
        tracing::debug!("Chat endpoint answered {} (ok: {})", status, reply.ok);

        if reply.ok {
            return Ok(reply.answer.unwrap_or_default());
        }
        let message = reply.error.unwrap_or_else(|| format!("HTTP {status}"));
        Err(ChatError::Offline(message))
    }
}

/// Synthesizes speech through `{endpoint}/api/tts`, asking for base64 so the
/// reply is always JSON.
#[derive(Debug, Clone)]
pub struct HttpSpeechService {
    http: reqwest::Client,
    url: String,
}

impl HttpSpeechService {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", endpoint.trim_end_matches('/'), TTS_PATH),
        }
    }
}

#[async_trait]
impl SpeechService for HttpSpeechService {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, RemoteError> {
        let mut body = TtsRequest::from(request);
        body.encoding = Some(BASE64_ENCODING.to_string());

        let response = self.http.post(&self.url).json(&body).send().await?;
        let status = response.status().as_u16();
        let reply: TtsReply = response.json().await?;

        if !reply.ok {
            return Err(RemoteError::Api {
                status,
                message: reply.error.unwrap_or_else(|| format!("HTTP {status}")),
                raw: None,
            });
        }
        reply.into_audio().map_err(|e| RemoteError::Api {
            status: 502,
            message: e.to_string(),
            raw: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use deck_live_api::{AppState, router};
    use deck_live_core::remote::AnswerService;
    use deck_live_openai::types::{AudioFormat, Voice};
    use std::sync::{Arc, Mutex};

    struct Echo;

    #[async_trait]
    impl AnswerService for Echo {
        async fn ask(&self, _instructions: &str, question: &str) -> Result<String, RemoteError> {
            Ok(format!("You asked: {question}"))
        }
    }

    #[derive(Default)]
    struct Tone {
        seen: Mutex<Vec<SpeechRequest>>,
    }

    #[async_trait]
    impl SpeechService for Tone {
        async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, RemoteError> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(SpeechAudio::new(request.format, vec![1_u8, 2, 3, 4]))
        }
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state))).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn chat_round_trips_through_the_api() {
        // Arrange
        let endpoint = serve(AppState::new(vec![]).with_answer_service(Arc::new(Echo))).await;
        let backend = HttpChatBackend::new(&endpoint);

        // Act
        let answer = backend.ask(&ChatRequest::new("Where is 2029?")).await.unwrap();

        // Assert
        assert_eq!(answer, "You asked: Where is 2029?");
    }

    #[tokio::test]
    async fn offline_api_maps_to_offline_error() {
        let endpoint = serve(AppState::new(vec![])).await;
        let backend = HttpChatBackend::new(&endpoint);

        let err = backend.ask(&ChatRequest::new("hi")).await.unwrap_err();

        match err {
            ChatError::Offline(message) => assert_eq!(message, "OPENAI_API_KEY not set"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn speech_is_decoded_from_base64() {
        // Arrange
        let tone = Arc::new(Tone::default());
        let endpoint = serve(AppState::new(vec![]).with_speech_service(tone.clone())).await;
        let service = HttpSpeechService::new(&endpoint);
        let request = SpeechRequest::new("Hello")
            .with_voice(Voice::Cedar)
            .with_format(AudioFormat::Wav);

        // Act
        let audio = service.synthesize(&request).await.unwrap();

        // Assert
        assert_eq!(audio.format, AudioFormat::Wav);
        assert_eq!(audio.bytes.as_ref(), &[1, 2, 3, 4]);
        let seen = tone.seen.lock().unwrap();
        assert_eq!(seen[0].voice, Some(Voice::Cedar));
        assert_eq!(seen[0].instructions, request.instructions);
    }

    #[tokio::test]
    async fn speech_offline_keeps_the_status() {
        let endpoint = serve(AppState::new(vec![])).await;
        let service = HttpSpeechService::new(&endpoint);

        let err = service.synthesize(&SpeechRequest::new("Hello")).await.unwrap_err();

        assert_eq!(err.status(), 200);
        assert_eq!(err.message(), "OPENAI_API_KEY not set");
    }
}
