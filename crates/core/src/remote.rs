use async_trait::async_trait;
use bytes::Bytes;
use deck_live_audio::audio::{decode_base64, encode_base64};
use deck_live_openai::types::{AudioFormat, ResponsesRequest, SpeechRequest as WireSpeechRequest, Voice};
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};

pub use deck_live_openai::Error as RemoteError;

pub const DEFAULT_SPEECH_INSTRUCTIONS: &str = "Speak like a confident Nordic business presenter.";

// `AnswerService` and `SpeechService` are the seams between the deck logic
// and the provider. The HTTP handlers and the presenter only see these
// traits, so tests swap in mocks and the offline case is simply `None`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// One non-streaming generation. `instructions` and `question` travel as
    /// separate fields.
    async fn ask(&self, instructions: &str, question: &str) -> Result<String, RemoteError>;
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechService: Send + Sync {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, RemoteError>;
}

/// What the deck asks the speech provider for.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechRequest {
    pub text: String,
    /// `None` uses the provider default voice.
    pub voice: Option<Voice>,
    pub instructions: String,
    pub format: AudioFormat,
}

impl SpeechRequest {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            voice: None,
            instructions: DEFAULT_SPEECH_INSTRUCTIONS.to_string(),
            format: AudioFormat::default(),
        }
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.voice = Some(voice);
        self
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = instructions.to_string();
        self
    }

    pub fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpeechAudioError {
    #[error("audio payload is not valid base64: {0}")]
    Base64(#[from] deck_live_audio::audio::Base64DecodeError),
    #[error("unsupported audio content type: {0}")]
    ContentType(String),
}

/// Encoded audio plus its container format.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechAudio {
    pub format: AudioFormat,
    pub bytes: Bytes,
}

impl SpeechAudio {
    pub fn new(format: AudioFormat, bytes: impl Into<Bytes>) -> Self {
        Self {
            format,
            bytes: bytes.into(),
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    /// Text-safe form for transports that cannot carry binary bodies.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.bytes)
    }

    /// Decodes the text-safe form back into audio.
    pub fn from_base64(content_type: &str, payload: &str) -> Result<Self, SpeechAudioError> {
        let format = AudioFormat::from_content_type(content_type)
            .ok_or_else(|| SpeechAudioError::ContentType(content_type.to_string()))?;
        let bytes = decode_base64(payload)?;
        Ok(Self::new(format, bytes))
    }
}

/// Body of `POST /api/tts`. Every field is optional on the wire; blank
/// values fall back to the service defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    /// `"base64"` asks for a JSON body instead of raw audio.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

pub const BASE64_ENCODING: &str = "base64";

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TtsRequest {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Default::default()
        }
    }

    pub fn text(&self) -> &str {
        non_blank(&self.text).unwrap_or("")
    }

    pub fn wants_base64(&self) -> bool {
        non_blank(&self.encoding).is_some_and(|e| e.eq_ignore_ascii_case(BASE64_ENCODING))
    }

    /// The speech job this payload describes. Unknown formats are reported
    /// back as the offending value.
    pub fn to_speech_request(&self, default_voice: &Voice) -> Result<SpeechRequest, String> {
        let format = match non_blank(&self.format) {
            Some(f) => f.parse::<AudioFormat>()?,
            None => AudioFormat::default(),
        };
        let voice = non_blank(&self.voice)
            .map(|v| v.parse::<Voice>().unwrap_or_else(|never| match never {}))
            .unwrap_or_else(|| default_voice.clone());
        let mut request = SpeechRequest::new(self.text())
            .with_voice(voice)
            .with_format(format);
        if let Some(instructions) = non_blank(&self.instructions) {
            request = request.with_instructions(instructions);
        }
        Ok(request)
    }
}

impl From<&SpeechRequest> for TtsRequest {
    fn from(request: &SpeechRequest) -> Self {
        Self {
            text: Some(request.text.clone()),
            voice: request.voice.as_ref().map(|v| v.as_str().to_string()),
            format: Some(request.format.as_str().to_string()),
            instructions: Some(request.instructions.clone()),
            encoding: None,
        }
    }
}

/// JSON body of `POST /api/tts`: errors, and audio when base64 was requested.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TtsReply {
    pub fn audio(audio: &SpeechAudio) -> Self {
        Self {
            ok: true,
            content_type: Some(audio.content_type().to_string()),
            audio_base64: Some(audio.to_base64()),
            error: None,
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    /// Decodes the audio of a successful reply.
    pub fn into_audio(self) -> Result<SpeechAudio, SpeechAudioError> {
        let content_type = self.content_type.unwrap_or_default();
        SpeechAudio::from_base64(&content_type, self.audio_base64.as_deref().unwrap_or(""))
    }
}

#[async_trait]
impl AnswerService for deck_live_openai::Client {
    async fn ask(&self, instructions: &str, question: &str) -> Result<String, RemoteError> {
        let request =
            ResponsesRequest::new(self.config().model(), question).with_instructions(instructions);
        self.create_response(&request).await
    }
}

#[async_trait]
impl SpeechService for deck_live_openai::Client {
    async fn synthesize(&self, request: &SpeechRequest) -> Result<SpeechAudio, RemoteError> {
        let voice = request
            .voice
            .clone()
            .unwrap_or_else(|| self.config().voice().clone());
        let wire = WireSpeechRequest::new(self.config().speech_model(), &request.text)
            .with_voice(voice)
            .with_instructions(&request.instructions)
            .with_response_format(request.format);
        let bytes = self.create_speech(&wire).await?;
        Ok(SpeechAudio::new(request.format, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_transport_decodes_in_place() {
        let audio = SpeechAudio::new(AudioFormat::Wav, vec![b'R', b'I', b'F', b'F', 0xff]);
        let payload = audio.to_base64();
        let back = SpeechAudio::from_base64("audio/wav", &payload).unwrap();
        assert_eq!(back, audio);
        assert_eq!(back.content_type(), "audio/wav");
    }

    #[test]
    fn base64_transport_rejects_bad_payloads() {
        assert!(matches!(
            SpeechAudio::from_base64("audio/mpeg", "%%%"),
            Err(SpeechAudioError::Base64(_))
        ));
        assert!(matches!(
            SpeechAudio::from_base64("text/html", "AAAA"),
            Err(SpeechAudioError::ContentType(_))
        ));
    }

    #[test]
    fn tts_payload_defaults_and_overrides() {
        let payload: TtsRequest = serde_json::from_str(
            r#"{"text":"  Hello  ","voice":"cedar","format":"wav","instructions":" ","encoding":"BASE64"}"#,
        )
        .unwrap();
        let request = payload.to_speech_request(&Voice::Marin).unwrap();
        assert_eq!(request.text, "Hello");
        assert_eq!(request.voice, Some(Voice::Cedar));
        assert_eq!(request.format, AudioFormat::Wav);
        assert_eq!(request.instructions, DEFAULT_SPEECH_INSTRUCTIONS);
        assert!(payload.wants_base64());

        let bare = TtsRequest::new("Hi").to_speech_request(&Voice::Marin).unwrap();
        assert_eq!(bare.voice, Some(Voice::Marin));
        assert_eq!(bare.format, AudioFormat::Mp3);
        assert!(!TtsRequest::new("Hi").wants_base64());
    }

    #[test]
    fn tts_payload_rejects_unknown_format() {
        let mut payload = TtsRequest::new("Hi");
        payload.format = Some("midi".to_string());
        assert!(payload.to_speech_request(&Voice::Marin).is_err());
    }

    #[test]
    fn tts_reply_carries_audio() {
        let audio = SpeechAudio::new(AudioFormat::Wav, vec![1u8, 2, 3]);
        let reply = TtsReply::audio(&audio);
        assert_eq!(reply.content_type.as_deref(), Some("audio/wav"));
        assert_eq!(reply.into_audio().unwrap(), audio);
    }

    #[test]
    fn speech_request_defaults() {
        let req = SpeechRequest::new("Hello");
        assert_eq!(req.instructions, DEFAULT_SPEECH_INSTRUCTIONS);
        assert_eq!(req.format, AudioFormat::Mp3);
        assert!(req.voice.is_none());
    }
}
