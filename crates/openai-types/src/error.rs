/// Error envelope returned by the provider on non-success statuses.
///
/// Every field is optional because proxies and gateways in front of the
/// provider do not always return the documented shape.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    error: Option<ErrorDetails>,
}

impl ApiErrorBody {
    pub fn error(&self) -> Option<&ErrorDetails> {
        self.error.as_ref()
    }

    /// The provider's message, if the body carried one.
    pub fn message(&self) -> Option<&str> {
        self.error
            .as_ref()
            .and_then(|e| e.message.as_deref())
            .filter(|m| !m.is_empty())
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorDetails {
    #[serde(rename = "type", default)]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    param: Option<String>,
}

impl ErrorDetails {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error_type: Some(error_type.to_string()),
            code: None,
            message: Some(message.to_string()),
            param: None,
        }
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }

    pub fn error_type(&self) -> Option<&str> {
        self.error_type.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn param(&self) -> Option<&str> {
        self.param.as_deref()
    }
}
