//! Request and response types exchanged with callers and with Ollama.

use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use velatura_error::{GatewayError, GatewayErrorKind, GatewayResult};

/// Generation request accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Prompt text, must not be empty
    pub prompt: String,
    /// Model override; the configured default is used when absent
    #[serde(default)]
    pub model: Option<String>,
    /// Streaming preference carried in the body
    #[serde(default)]
    pub stream: Option<bool>,
}

impl GenerateRequest {
    /// Creates a request for the default model.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            stream: None,
        }
    }

    /// Rejects requests that must not reach upstream.
    pub fn validate(&self) -> GatewayResult<()> {
        if self.prompt.is_empty() {
            return Err(GatewayError::new(GatewayErrorKind::Validation(
                "prompt must not be empty".to_string(),
            )));
        }
        Ok(())
    }

    /// Builds the upstream payload, falling back to `default_model`.
    pub fn to_upstream(&self, default_model: &str, stream: bool) -> UpstreamRequest {
        let model = self
            .model
            .clone()
            .unwrap_or_else(|| default_model.to_string());
        UpstreamRequest {
            model,
            prompt: self.prompt.clone(),
            stream,
        }
    }
}

/// Payload posted to Ollama's `/api/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct UpstreamRequest {
    /// Model identifier
    model: String,
    /// Prompt text
    prompt: String,
    /// Whether Ollama should answer with NDJSON fragments
    stream: bool,
}

/// One object from Ollama, either the whole answer or a streamed fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct UpstreamFragment {
    /// Generated text carried by this fragment
    #[serde(default)]
    pub response: String,
    /// Set on the terminal fragment
    #[serde(default)]
    pub done: bool,
    /// Model that produced the text
    #[serde(default)]
    pub model: Option<String>,
    /// Total generation time in nanoseconds, present on the terminal fragment
    #[serde(default)]
    pub total_duration: Option<u64>,
}

/// Single-shot answer returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateResponse {
    /// Model that produced the text
    pub model: Option<String>,
    /// Generated text with reasoning markup removed
    pub response: String,
    /// Total generation time in nanoseconds
    pub total_duration: Option<u64>,
}
