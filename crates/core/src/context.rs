use crate::scorer::ScoredSlide;
use crate::slides::DeckFacts;

pub const SCRIPT_EXCERPT_CHARS: usize = 800;
pub const BODY_EXCERPT_CHARS: usize = 2200;
pub const NO_CONTEXT: &str = "(No context available)";
pub const DEFAULT_DECK_TITLE: &str = "the strategy deck";

const SLIDE_SEPARATOR: &str = "\n\n---\n\n";

/// The slide the audience is looking at while the question is asked.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentSlide {
    pub key: String,
    pub name: String,
}

impl CurrentSlide {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.trim().to_string(),
            name: name.trim().to_string(),
        }
    }
}

/// Builds the instruction text sent alongside a question.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    deck_title: String,
    script_limit: usize,
    excerpt_limit: usize,
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_DECK_TITLE)
    }
}

impl ContextAssembler {
    pub fn new(deck_title: &str) -> Self {
        Self {
            deck_title: deck_title.to_string(),
            script_limit: SCRIPT_EXCERPT_CHARS,
            excerpt_limit: BODY_EXCERPT_CHARS,
        }
    }

    /// An explicit title wins, then the dataset title, then the default.
    pub fn for_deck(title: Option<&str>, facts: &DeckFacts) -> Self {
        let title = title
            .filter(|t| !t.trim().is_empty())
            .or(facts.title.as_deref().filter(|t| !t.trim().is_empty()))
            .unwrap_or(DEFAULT_DECK_TITLE);
        Self::new(title.trim())
    }

    pub fn with_limits(mut self, script_limit: usize, excerpt_limit: usize) -> Self {
        self.script_limit = script_limit;
        self.excerpt_limit = excerpt_limit;
        self
    }

    pub fn deck_title(&self) -> &str {
        &self.deck_title
    }

    /// One block per slide, separated by a horizontal rule.
    pub fn context_block(&self, slides: &[ScoredSlide<'_>]) -> String {
        slides
            .iter()
            .map(|s| {
                format!(
                    "SLIDE {} — {}\nKey script: {}\nContent excerpt: {}",
                    s.slide.key,
                    s.slide.name,
                    truncate_chars(&s.slide.script, self.script_limit),
                    truncate_chars(&s.slide.text, self.excerpt_limit),
                )
            })
            .collect::<Vec<_>>()
            .join(SLIDE_SEPARATOR)
    }

    /// Full instructions: persona, grounding rules, the current slide and the
    /// selected context.
    pub fn assemble(&self, slides: &[ScoredSlide<'_>], current: &CurrentSlide) -> String {
        let block = self.context_block(slides);
        let current_key = if current.key.is_empty() {
            "-"
        } else {
            current.key.as_str()
        };
        let current_name = if current.name.is_empty() {
            String::new()
        } else {
            format!(" ({})", current.name)
        };

        [
            format!("You are the LIVE strategy guide for \"{}\".", self.deck_title),
            "Answer as a confident, pragmatic business presenter.".to_string(),
            "Hard rule: use ONLY the information in the provided slide context. If a detail is not in context, say so and suggest where it should be added in the deck.".to_string(),
            "When quoting numbers or ranges, keep exactly as in the deck.".to_string(),
            "When relevant, end with: \"Source slides: <comma-separated slide keys>\".".to_string(),
            String::new(),
            format!("Current slide on screen: {current_key}{current_name}"),
            String::new(),
            "DECK CONTEXT (selected relevant slides):".to_string(),
            if block.is_empty() {
                NO_CONTEXT.to_string()
            } else {
                block
            },
        ]
        .join("\n")
    }
}

/// At most `limit` characters of `text`, never splitting a code point.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
