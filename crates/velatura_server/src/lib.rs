//! HTTP gateway and Ollama supervisor for Velatura.
//!
//! The gateway forwards `POST /api/generate` to a single Ollama endpoint and
//! strips `<think>` reasoning markup from what comes back, incrementally for
//! streamed answers. The supervisor starts `ollama serve`, waits for it, and
//! pulls the configured model on first run.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod api;
mod client;
mod config;
mod ollama;
mod stream;
mod traits;

pub use api::{ApiError, ApiState, GenerateParams, cors_layer, create_router, parse_flag, serve};
pub use client::OllamaClient;
pub use config::{
    AllowedOrigins, DEFAULT_GATEWAY_PORT, DEFAULT_MODEL, DEFAULT_OLLAMA_PORT,
    DEFAULT_UPSTREAM_URL, GatewayConfig, GatewayConfigBuilder, SupervisorConfig,
    SupervisorConfigBuilder,
};
pub use ollama::{OllamaLauncher, OllamaModels, OllamaServer, lan_ip, list_contains, supervise};
pub use stream::{LineBuffer, cleaned_text, parse_fragment};
pub use traits::{InferenceServer, ModelManager, ServerLauncher};
