pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";

pub const BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_SPEECH_MODEL: &str = "gpt-4o-mini-tts";

pub const RESPONSES_PATH: &str = "/responses";
pub const SPEECH_PATH: &str = "/audio/speech";

pub const RESPONSES_FALLBACK_ERROR: &str = "OpenAI request failed";
pub const SPEECH_FALLBACK_ERROR: &str = "TTS failed";
