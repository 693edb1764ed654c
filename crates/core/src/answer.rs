use crate::chat::{ChatBackend, ChatError, ChatRequest};
use crate::context::ContextAssembler;
use crate::remote::{AnswerService, RemoteError};
use crate::scorer::{DEFAULT_TOP_N, top_slides};
use crate::slides::{DeckFacts, load_deck_facts};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub const MISSING_KEY: &str = "OPENAI_API_KEY not set";

/// Ranks the deck against the question, builds the instructions and asks the
/// service. An empty question is the caller's concern.
pub async fn answer_question(
    service: &dyn AnswerService,
    facts: &DeckFacts,
    request: &ChatRequest,
    assembler: &ContextAssembler,
) -> Result<String, RemoteError> {
    let question = request.question_text();
    let picked = top_slides(question, &facts.slides, DEFAULT_TOP_N);
    tracing::debug!(
        "Selected slides: {:?}",
        picked
            .iter()
            .map(|s| (s.slide.key.as_str(), s.score))
            .collect::<Vec<_>>()
    );
    let instructions = assembler.assemble(&picked, &request.current_slide());
    service.ask(&instructions, question).await
}

/// In-process chat backend: same pipeline as the HTTP API without the hop.
pub struct LocalChatBackend {
    service: Option<Arc<dyn AnswerService>>,
    facts_candidates: Vec<PathBuf>,
    deck_title: Option<String>,
}

impl LocalChatBackend {
    pub fn new(service: Option<Arc<dyn AnswerService>>, facts_candidates: Vec<PathBuf>) -> Self {
        Self {
            service,
            facts_candidates,
            deck_title: None,
        }
    }

    pub fn with_deck_title(mut self, title: Option<String>) -> Self {
        self.deck_title = title;
        self
    }
}

#[async_trait]
impl ChatBackend for LocalChatBackend {
    async fn ask(&self, request: &ChatRequest) -> Result<String, ChatError> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| ChatError::Offline(MISSING_KEY.to_string()))?;
        let facts = load_deck_facts(&self.facts_candidates);
        let assembler = ContextAssembler::for_deck(self.deck_title.as_deref(), &facts);
        Ok(answer_question(service.as_ref(), &facts, request, &assembler).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::MockAnswerService;
    use crate::slides::SlideFact;
    use std::io::Write;

    fn facts() -> DeckFacts {
        DeckFacts {
            title: None,
            slides: vec![
                SlideFact::new("intro", "Intro", "Welcome.", "Agenda"),
                SlideFact::new("gates_2027", "Hard gates", "Hard gate: 39.5% gross margin", "gates"),
            ],
        }
    }

    #[tokio::test]
    async fn question_and_context_travel_separately() {
        // Arrange
        let mut service = MockAnswerService::new();
        service
            .expect_ask()
            .withf(|instructions, question| {
                question == "What are the hard gates?"
                    && instructions.contains("Hard gate: 39.5%")
                    && instructions.contains("Current slide on screen: intro (Intro)")
            })
            .times(1)
            .returning(|_, _| Ok("Gross margin above 39.5%.".to_string()));
        let mut request = ChatRequest::new("What are the hard gates?");
        request.current_slide_key = Some("intro".to_string());
        request.current_slide_name = Some("Intro".to_string());

        // Act
        let answer = answer_question(&service, &facts(), &request, &ContextAssembler::default())
            .await
            .unwrap();

        // Assert
        assert_eq!(answer, "Gross margin above 39.5%.");
    }

    #[tokio::test]
    async fn remote_errors_pass_through() {
        let mut service = MockAnswerService::new();
        service.expect_ask().returning(|_, _| {
            Err(RemoteError::Api {
                status: 429,
                message: "Rate limited".to_string(),
                raw: None,
            })
        });

        let err = answer_question(&service, &facts(), &ChatRequest::new("q?"), &ContextAssembler::default())
            .await
            .unwrap_err();

        assert_eq!(err.status(), 429);
    }

    #[tokio::test]
    async fn local_backend_without_service_is_offline() {
        let backend = LocalChatBackend::new(None, vec![]);
        let err = backend.ask(&ChatRequest::new("anything")).await.unwrap_err();
        assert!(matches!(err, ChatError::Offline(ref m) if m == MISSING_KEY));
    }

    #[tokio::test]
    async fn local_backend_reads_dataset_per_request() {
        // Arrange
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"title":"Path to 100 M€","slides":[{{"key":"year_2029","name":"2029","script":"We land at 100M€."}}]}}"#
        )
        .unwrap();
        let mut service = MockAnswerService::new();
        service
            .expect_ask()
            .withf(|instructions, question| {
                instructions.contains("\"Path to 100 M€\"")
                    && instructions.contains("SLIDE year_2029 — 2029")
                    && question == "How do we reach 100M€?"
            })
            .returning(|_, _| Ok("By 2029.".to_string()));
        let backend = LocalChatBackend::new(Some(Arc::new(service)), vec![file.path().to_path_buf()]);

        // Act
        let answer = backend.ask(&ChatRequest::new("How do we reach 100M€?")).await.unwrap();

        // Assert
        assert_eq!(answer, "By 2029.");
    }
}
