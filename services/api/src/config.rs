use deck_live_core::slides::default_candidates;
use deck_live_openai::consts::{BASE_URL, DEFAULT_MODEL, DEFAULT_SPEECH_MODEL};
use deck_live_openai::types::Voice;
use secrecy::SecretString;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// `None` keeps the service up in offline mode.
    pub openai_api_key: Option<SecretString>,
    pub base_url: String,
    pub chat_model: String,
    pub speech_model: String,
    pub speech_voice: Voice,
    pub deck_facts_path: Option<PathBuf>,
    pub deck_title: Option<String>,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// This function will look for a `.env` file in the current directory
    /// and load the following variables:
    ///
    /// *   `BIND_ADDRESS`: The address and port to bind the server to. Defaults to "0.0.0.0:3000".
    /// *   `OPENAI_API_KEY`: (Optional) Provider credential. Without it chat and tts answer `ok: false`.
    /// *   `OPENAI_BASE_URL`: (Optional) Provider base URL.
    /// *   `OPENAI_MODEL`: (Optional) Model for answers. Defaults to "gpt-4o-mini".
    /// *   `OPENAI_TTS_MODEL`: (Optional) Speech model. Defaults to "gpt-4o-mini-tts".
    /// *   `OPENAI_TTS_VOICE`: (Optional) Default voice. Defaults to "marin".
    /// *   `DECK_FACTS_PATH`: (Optional) Explicit slide facts dataset.
    /// *   `DECK_TITLE`: (Optional) Deck title used in the answer persona.
    /// *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` over an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_address_str = var("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let log_level_str = var("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let speech_voice = var("OPENAI_TTS_VOICE")
            .map(|v| v.parse::<Voice>().unwrap_or_else(|never| match never {}))
            .unwrap_or_default();

        Ok(Self {
            bind_address,
            openai_api_key: var("OPENAI_API_KEY").map(SecretString::from),
            base_url: var("OPENAI_BASE_URL").unwrap_or_else(|| BASE_URL.to_string()),
            chat_model: var("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            speech_model: var("OPENAI_TTS_MODEL").unwrap_or_else(|| DEFAULT_SPEECH_MODEL.to_string()),
            speech_voice,
            deck_facts_path: var("DECK_FACTS_PATH").map(PathBuf::from),
            deck_title: var("DECK_TITLE"),
            log_level,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Where the dataset is looked up, in order.
    pub fn facts_candidates(&self) -> Vec<PathBuf> {
        match &self.deck_facts_path {
            Some(path) => vec![path.clone()],
            None => default_candidates(),
        }
    }

    /// Provider client settings, or `None` without a credential.
    pub fn openai_config(&self) -> Option<deck_live_openai::Config> {
        let key = self.openai_api_key.clone()?;
        Some(
            deck_live_openai::Config::builder()
                .with_base_url(&self.base_url)
                .with_secret_api_key(key)
                .with_model(&self.chat_model)
                .with_speech_model(&self.speech_model)
                .with_voice(self.speech_voice.clone())
                .build(),
        )
    }
}
