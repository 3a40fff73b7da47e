//! HTTP client for the upstream Ollama server.

use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, error, instrument, warn};
use velatura_core::{UpstreamFragment, UpstreamRequest};
use velatura_error::{GatewayError, GatewayErrorKind, GatewayResult};

#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Client for a single Ollama endpoint.
///
/// No request timeout is set: generation on a local model can legitimately
/// run for minutes.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

impl OllamaClient {
    /// Creates a client for the Ollama server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(url = %base_url, "Created Ollama client");
        Self {
            client: Client::new(),
            base_url,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Posts a generation request and returns the raw response once upstream
    /// has answered with a success status.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayErrorKind::Upstream`] if the request cannot be sent and
    /// [`GatewayErrorKind::UpstreamStatus`] if Ollama answers with a non-2xx
    /// status; the latter carries Ollama's body text.
    #[instrument(skip(self, payload), fields(model = %payload.model(), stream = *payload.stream()))]
    pub async fn generate(&self, payload: &UpstreamRequest) -> GatewayResult<Response> {
        let url = format!("{}/api/generate", self.base_url);
        debug!(url = %url, "Sending generation request");

        let response = self.client.post(&url).json(payload).send().await.map_err(|e| {
            error!(error = ?e, "Ollama request failed");
            GatewayError::new(GatewayErrorKind::Upstream(e.to_string()))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(e) => {
                    warn!(status = %status, error = ?e, "Failed to read Ollama error body");
                    String::new()
                }
            };
            error!(status = %status, body = %body, "Ollama returned an error status");
            return Err(GatewayError::new(GatewayErrorKind::UpstreamStatus {
                status: status.as_u16(),
                body,
            }));
        }

        Ok(response)
    }

    /// Runs a non-streaming generation and parses the single JSON answer.
    #[instrument(skip(self, payload), fields(model = %payload.model()))]
    pub async fn generate_once(&self, payload: &UpstreamRequest) -> GatewayResult<UpstreamFragment> {
        let response = self.generate(payload).await?;
        let body = response.bytes().await.map_err(|e| {
            error!(error = ?e, "Failed to read Ollama response body");
            GatewayError::new(GatewayErrorKind::Upstream(e.to_string()))
        })?;

        serde_json::from_slice(&body).map_err(|e| {
            error!(error = ?e, "Failed to parse Ollama response");
            GatewayError::new(GatewayErrorKind::Json(e.to_string()))
        })
    }

    /// Fetches the server version; any success means the server is up.
    #[instrument(skip(self))]
    pub async fn version(&self) -> GatewayResult<String> {
        let url = format!("{}/api/version", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|e| GatewayError::new(GatewayErrorKind::Upstream(e.to_string())))?;

        let version: VersionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::new(GatewayErrorKind::Json(e.to_string())))?;
        Ok(version.version)
    }
}
