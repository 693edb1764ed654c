/// Failure modes of a call to the provider.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api {
        status: u16,
        message: String,
        /// The decoded error body, when it was JSON.
        raw: Option<serde_json::Value>,
    },
    /// The request never produced a response (DNS, TLS, connection reset, ...).
    #[error("request to provider failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// The HTTP status to forward to our own caller.
    pub fn status(&self) -> u16 {
        match self {
            Error::Api { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()).unwrap_or(500),
        }
    }

    /// The message to show to our own caller.
    pub fn message(&self) -> String {
        match self {
            Error::Api { message, .. } => message.clone(),
            Error::Http(e) => e.to_string(),
        }
    }
}
