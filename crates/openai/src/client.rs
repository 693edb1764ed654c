use crate::error::Error;
use crate::types::{ApiErrorBody, ResponsesRequest, ResponsesResponse, SpeechRequest};
use bytes::Bytes;
use secrecy::ExposeSecret;
use std::sync::{Arc, Mutex};

pub(crate) mod config;
pub mod consts;
pub(crate) mod stats;

use config::Config;
use stats::Stats;

/// Thin async client for the two provider endpoints the proxy needs.
///
/// One outbound request per call, no retries, and no timeout beyond the
/// transport default.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    config: Arc<Config>,
    stats: Arc<Mutex<Stats>>,
}

impl Client {
    pub fn new(config: Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            config: Arc::new(config),
            stats: Arc::new(Mutex::new(Stats::new())),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sends a Responses API request and returns the answer text.
    ///
    /// A success status with a body that does not decode is reported as an
    /// empty answer rather than an error.
    pub async fn create_response(&self, request: &ResponsesRequest) -> Result<String, Error> {
        let url = format!("{}{}", self.config.base_url(), consts::RESPONSES_PATH);
        tracing::debug!("POST {} model={}", url, request.model());

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key().expose_secret())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(api_error(
                status.as_u16(),
                &body,
                consts::RESPONSES_FALLBACK_ERROR,
            ));
        }

        let parsed = match serde_json::from_slice::<ResponsesResponse>(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("failed to decode responses body: {}", e);
                return Ok(String::new());
            }
        };

        if let Ok(mut stats_guard) = self.stats.lock() {
            stats_guard.update_usage(parsed.usage());
        } else {
            tracing::error!("failed to update stats");
        }
        if let Some(usage) = parsed.usage() {
            tracing::debug!(
                "total_tokens: {}, input_tokens: {}, output_tokens: {}",
                usage.total_tokens,
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(parsed.text())
    }

    /// Sends a speech request and returns the encoded audio bytes.
    pub async fn create_speech(&self, request: &SpeechRequest) -> Result<Bytes, Error> {
        let url = format!("{}{}", self.config.base_url(), consts::SPEECH_PATH);
        tracing::debug!(
            "POST {} model={} voice={} chars={}",
            url,
            request.model(),
            request.voice().as_str(),
            request.input().chars().count()
        );

        let resp = self
            .http
            .post(&url)
            .bearer_auth(self.config.api_key().expose_secret())
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(api_error(
                status.as_u16(),
                &body,
                consts::SPEECH_FALLBACK_ERROR,
            ));
        }
        Ok(body)
    }

    // Return a snapshot of the usage stats.
    pub fn stats(&self) -> Stats {
        match self.stats.lock() {
            Ok(stats_guard) => stats_guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// Builds the error for a non-success status from whatever the body holds.
fn api_error(status: u16, body: &[u8], fallback: &str) -> Error {
    let raw = serde_json::from_slice::<serde_json::Value>(body).ok();
    let message = raw
        .as_ref()
        .and_then(|v| serde_json::from_value::<ApiErrorBody>(v.clone()).ok())
        .and_then(|b| b.message().map(str::to_string))
        .unwrap_or_else(|| fallback.to_string());
    tracing::warn!("provider returned {}: {}", status, message);
    Error::Api {
        status,
        message,
        raw,
    }
}
