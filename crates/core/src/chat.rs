use crate::context::CurrentSlide;
use crate::remote::RemoteError;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const WELCOME_MESSAGE: &str = "Ask anything about the journey. Examples: “What are the hard gates?”, “How do we reach 100M€?”, “What changes in field force?”";
pub const CLEARED_MESSAGE: &str = "Cleared. Ask me about any slide, number, gate, or execution plan.";
pub const OFFLINE_MESSAGE: &str = "Chat is offline. Set OPENAI_API_KEY (and optionally OPENAI_MODEL).";
pub const NO_ANSWER: &str = "No answer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "you",
            ChatRole::Assistant => "assistant",
            ChatRole::System => "system",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

/// Conversation shown in the chat dock. Turns are only ever appended;
/// `clear` is the one way to drop them.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    turns: Vec<ChatTurn>,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_greeting(greeting: &str) -> Self {
        let mut log = Self::new();
        log.push(ChatRole::System, greeting);
        log
    }

    pub fn push(&mut self, role: ChatRole, text: &str) {
        self.turns.push(ChatTurn {
            role,
            text: text.to_string(),
        });
    }

    pub fn clear(&mut self) {
        self.turns.clear();
        self.push(ChatRole::System, CLEARED_MESSAGE);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn last(&self) -> Option<&ChatTurn> {
        self.turns.last()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// Slide the viewer is on when the question is sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slide_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default)]
    pub slide_script: String,
    #[serde(default)]
    pub slide_hint: String,
}

/// Body of `POST /api/chat`.
///
/// Older clients send `message` with flat `currentSlideKey`/`currentSlideName`
/// fields; newer ones send `question` with a nested `context`. Both shapes are
/// accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub question: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<SlideContext>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_slide_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_slide_name: Option<String>,
}

/// Numbers and booleans are taken as their text; null, arrays and objects
/// count as absent.
fn scalar_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    })
}

impl ChatRequest {
    pub fn new(question: &str) -> Self {
        Self {
            question: Some(question.to_string()),
            ..Default::default()
        }
    }

    pub fn with_context(mut self, context: SlideContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Trimmed question text; `question` wins over `message` when both carry
    /// text.
    pub fn question_text(&self) -> &str {
        [self.question.as_deref(), self.message.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|q| !q.is_empty())
            .unwrap_or("")
    }

    pub fn current_slide(&self) -> CurrentSlide {
        let nested = self.context.as_ref();
        let key = nested
            .and_then(|c| c.slide_key.as_deref())
            .or(self.current_slide_key.as_deref())
            .unwrap_or("");
        let name = nested
            .and_then(|c| c.slide_name.as_deref())
            .or(self.current_slide_name.as_deref())
            .unwrap_or("");
        CurrentSlide::new(key, name)
    }
}

/// Body returned by `POST /api/chat`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ChatReply {
    pub fn answered(answer: &str) -> Self {
        Self {
            ok: true,
            answer: Some(answer.to_string()),
            ..Default::default()
        }
    }

    pub fn failed(error: &str) -> Self {
        Self {
            ok: false,
            error: Some(error.to_string()),
            ..Default::default()
        }
    }

    pub fn with_raw(mut self, raw: Option<Value>) -> Self {
        self.raw = raw;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("{0}")]
    Offline(String),
}

/// Where the session sends questions: the HTTP API or an in-process pipeline.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn ask(&self, request: &ChatRequest) -> Result<String, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clear_leaves_single_greeting() {
        let mut log = ChatLog::with_greeting(WELCOME_MESSAGE);
        log.push(ChatRole::User, "q");
        log.push(ChatRole::Assistant, "a");
        log.clear();
        assert_eq!(log.len(), 1);
        assert_eq!(log.turns()[0].role, ChatRole::System);
        assert_eq!(log.turns()[0].text, CLEARED_MESSAGE);
    }

    #[test]
    fn request_accepts_both_shapes() {
        let legacy: ChatRequest = serde_json::from_value(json!({
            "message": "  How do we reach 100M€? ",
            "currentSlideKey": "year_2027",
            "currentSlideName": "2027"
        }))
        .unwrap();
        assert_eq!(legacy.question_text(), "How do we reach 100M€?");
        assert_eq!(legacy.current_slide(), CurrentSlide::new("year_2027", "2027"));

        let nested: ChatRequest = serde_json::from_value(json!({
            "question": "What are the hard gates?",
            "context": {"slide_key": "gates_2027", "slide_name": null, "year": 2027, "slide_script": "s"}
        }))
        .unwrap();
        assert_eq!(nested.question_text(), "What are the hard gates?");
        assert_eq!(nested.current_slide(), CurrentSlide::new("gates_2027", ""));
        assert_eq!(nested.context.unwrap().year, Some(2027));
    }

    #[test]
    fn scalar_questions_are_taken_as_text() {
        let numeric: ChatRequest = serde_json::from_value(json!({"message": 42})).unwrap();
        assert_eq!(numeric.question_text(), "42");

        let mixed: ChatRequest =
            serde_json::from_value(json!({"question": null, "message": true})).unwrap();
        assert_eq!(mixed.question_text(), "true");

        let nested: ChatRequest =
            serde_json::from_value(json!({"question": ["a"], "message": {"b": 1}})).unwrap();
        assert_eq!(nested.question_text(), "");
    }

    #[test]
    fn blank_question_falls_back_to_message() {
        let req = ChatRequest {
            question: Some("   ".to_string()),
            message: Some("hi".to_string()),
            ..Default::default()
        };
        assert_eq!(req.question_text(), "hi");
        assert_eq!(ChatRequest::default().question_text(), "");
    }

    #[test]
    fn reply_skips_absent_fields() {
        let value = serde_json::to_value(ChatReply::answered("yes")).unwrap();
        assert_eq!(value, json!({"ok": true, "answer": "yes"}));

        let value = serde_json::to_value(ChatReply::failed("Missing message")).unwrap();
        assert_eq!(value, json!({"ok": false, "error": "Missing message"}));
    }
}
