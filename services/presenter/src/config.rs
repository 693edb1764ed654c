//! Presenter configuration.
//!
//! Loaded from the same environment variables as the API so one `.env` file
//! serves both binaries.

use deck_live_core::slides::default_candidates;
use deck_live_openai::consts::{BASE_URL, DEFAULT_MODEL, DEFAULT_SPEECH_MODEL};
use deck_live_openai::types::Voice;
use secrecy::SecretString;
use std::path::PathBuf;
use tracing::Level;

// --- Playback Constants ---

/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// Longest clip the output buffer holds, in seconds.
pub const MAX_CLIP_SECONDS: usize = 90;
/// Frame interval of the terminal renderer.
pub const DEFAULT_FPS: u32 = 60;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub openai_api_key: Option<SecretString>,
    pub base_url: String,
    pub chat_model: String,
    pub speech_model: String,
    pub speech_voice: Voice,
    pub deck_facts_path: Option<PathBuf>,
    pub deck_title: Option<String>,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `OPENAI_API_KEY`: (Optional) Without it the local pipeline runs offline.
    // *   `OPENAI_MODEL`, `OPENAI_TTS_MODEL`, `OPENAI_TTS_VOICE`, `OPENAI_BASE_URL`: provider settings.
    // *   `DECK_FACTS_PATH`, `DECK_TITLE`: dataset location and persona title.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "WARN" so frames stay readable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. This is useful for local development and is ignored if not present.
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "WARN".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            openai_api_key: var("OPENAI_API_KEY").map(SecretString::from),
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| BASE_URL.to_string()),
            chat_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            speech_model: var("OPENAI_TTS_MODEL")
                .unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            speech_voice: var("OPENAI_TTS_VOICE")
                .map(|v| v.parse::<Voice>().unwrap_or_else(|never| match never {}))
                .unwrap_or_default(),
            deck_facts_path: var("DECK_FACTS_PATH").map(PathBuf::from),
            deck_title: var("DECK_TITLE"),
            log_level,
        })
    }

    /// Where the dataset is looked up; an explicit path wins over the
    /// environment and the defaults.
    pub fn facts_candidates(&self, explicit: Option<PathBuf>) -> Vec<PathBuf> {
        match explicit.or_else(|| self.deck_facts_path.clone()) {
            Some(path) => vec![path],
            None => default_candidates(),
        }
    }

    /// Direct provider client, when a credential is present.
    pub fn openai_client(&self) -> Option<deck_live_openai::Client> {
        let key = self.openai_api_key.clone()?;
        let config = deck_live_openai::Config::builder()
            .with_base_url(&self.base_url)
            .with_secret_api_key(key)
            .with_model(&self.chat_model)
            .with_speech_model(&self.speech_model)
            .with_voice(self.speech_voice.clone())
            .build();
        Some(deck_live_openai::Client::new(config))
    }
}
