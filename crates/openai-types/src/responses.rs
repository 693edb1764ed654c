/// Request body for `POST /responses`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResponsesRequest {
    /// Model id, ex: "gpt-4o-mini".
    model: String,

    /// System-level instructions inserted ahead of the input.
    #[serde(skip_serializing_if = "Option::is_none")]
    instructions: Option<String>,

    /// The user input, sent as a plain string.
    input: String,

    /// Sampling temperature. Left to the provider default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

impl ResponsesRequest {
    pub fn new(model: &str, input: &str) -> Self {
        Self {
            model: model.to_string(),
            instructions: None,
            input: input.to_string(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    pub fn with_instructions(mut self, instructions: &str) -> Self {
        self.instructions = Some(instructions.to_string());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn instructions(&self) -> Option<&str> {
        self.instructions.as_deref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }
}

/// Successful response body for `POST /responses`.
///
/// Only the fields the proxy reads are modelled; everything else is ignored.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    id: Option<String>,

    /// Convenience aggregate some SDKs and gateways add to the body.
    #[serde(default)]
    output_text: Option<String>,

    #[serde(default)]
    output: Vec<OutputItem>,

    #[serde(default)]
    usage: Option<Usage>,
}

impl ResponsesResponse {
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn usage(&self) -> Option<&Usage> {
        self.usage.as_ref()
    }

    pub fn output(&self) -> &[OutputItem] {
        &self.output
    }

    /// The answer text: `output_text` when present, otherwise every
    /// `output_text` part of every message item, concatenated in order.
    pub fn text(&self) -> String {
        if let Some(text) = self.output_text.as_deref().filter(|t| !t.is_empty()) {
            return text.to_string();
        }
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.content_type == "output_text")
            .filter_map(|part| part.text.as_deref())
            .collect::<Vec<_>>()
            .join("")
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    item_type: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Vec<OutputContent>,
}

impl OutputItem {
    pub fn item_type(&self) -> &str {
        &self.item_type
    }

    pub fn role(&self) -> Option<&str> {
        self.role.as_deref()
    }

    pub fn content(&self) -> &[OutputContent] {
        &self.content
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type", default)]
    content_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl OutputContent {
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}
