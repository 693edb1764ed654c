use super::consts;
use deck_live_openai_types::Voice;
use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct Config {
    base_url: String,
    api_key: SecretString,
    model: String,
    speech_model: String,
    voice: Voice,
}

pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.config.api_key = SecretString::from(api_key.to_string());
        self
    }

    pub fn with_secret_api_key(mut self, api_key: SecretString) -> Self {
        self.config.api_key = api_key;
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.config.model = model.to_string();
        self
    }

    pub fn with_speech_model(mut self, model: &str) -> Self {
        self.config.speech_model = model.to_string();
        self
    }

    pub fn with_voice(mut self, voice: Voice) -> Self {
        self.config.voice = voice;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    // Sets the default values.
    pub fn new() -> Self {
        Self {
            base_url: consts::BASE_URL.to_string(),
            // An unset key is not an error here; callers check `has_api_key`
            // and degrade to an offline answer instead.
            api_key: std::env::var(consts::OPENAI_API_KEY)
                .unwrap_or_default()
                .into(),
            model: consts::DEFAULT_MODEL.to_string(),
            speech_model: consts::DEFAULT_SPEECH_MODEL.to_string(),
            voice: Voice::default(),
        }
    }

    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn api_key(&self) -> &SecretString {
        &self.api_key
    }

    pub fn has_api_key(&self) -> bool {
        use secrecy::ExposeSecret;
        !self.api_key.expose_secret().trim().is_empty()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn speech_model(&self) -> &str {
        &self.speech_model
    }

    pub fn voice(&self) -> &Voice {
        &self.voice
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
