use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Relative location of the deck facts dataset.
pub const DECK_FACTS_RELATIVE_PATH: &str = "data/deck_facts.json";

/// One slide of the deck as used for retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlideFact {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub name: String,
    /// Narration text.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub script: String,
    /// Slide body excerpt.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub text: String,
}

fn null_as_empty<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(d)?.unwrap_or_default())
}

impl SlideFact {
    pub fn new(key: &str, name: &str, script: &str, text: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            script: script.to_string(),
            text: text.to_string(),
        }
    }
}

/// The dataset file: an optional deck title and the slide records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckFacts {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slides: Vec<SlideFact>,
}

impl DeckFacts {
    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }

    pub fn find(&self, key: &str) -> Option<&SlideFact> {
        self.slides.iter().find(|s| s.key == key)
    }
}

/// Reads and parses one dataset file.
pub fn read_deck_facts(path: &Path) -> Result<DeckFacts> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read deck facts: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse deck facts: {}", path.display()))
}

/// Default lookup order: the working directory, then next to the executable.
pub fn default_candidates() -> Vec<PathBuf> {
    let mut candidates = vec![PathBuf::from(DECK_FACTS_RELATIVE_PATH)];
    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        candidates.push(dir.join(DECK_FACTS_RELATIVE_PATH));
    }
    candidates
}

/// Loads the first candidate that exists and parses.
///
/// Never fails: a missing or broken dataset is logged and yields an empty
/// deck so retrieval degrades to "no context".
pub fn load_deck_facts(candidates: &[PathBuf]) -> DeckFacts {
    for path in candidates {
        if !path.is_file() {
            continue;
        }
        match read_deck_facts(path) {
            Ok(facts) => {
                tracing::debug!(
                    "Loaded {} slides from {}",
                    facts.slides.len(),
                    path.display()
                );
                return facts;
            }
            Err(e) => tracing::warn!("{:#}", e),
        }
    }
    tracing::debug!("No deck facts found in {} candidates", candidates.len());
    DeckFacts::default()
}
