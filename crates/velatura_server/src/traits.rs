//! Trait interfaces for supervising a local inference server
//!
//! - [`InferenceServer`] - Server lifecycle and health management
//! - [`ServerLauncher`] - Server creation and initialization
//! - [`ModelManager`] - Model downloading

use async_trait::async_trait;
use std::process::ExitStatus;
use std::time::Duration;
use velatura_error::ServerError;

/// Trait for managing the lifecycle of an inference server process
#[async_trait]
pub trait InferenceServer: Send + Sync {
    /// Get the port the server is listening on
    fn port(&self) -> u16;

    /// Get the base URL of the server (e.g., "http://localhost:11434")
    fn base_url(&self) -> String;

    /// Check if the server is healthy and responding to requests
    async fn health_check(&self) -> Result<(), ServerError>;

    /// Wait for the server to become ready
    ///
    /// Polls the health endpoint until it responds successfully. With
    /// `timeout` set to `None` this waits indefinitely.
    async fn wait_until_ready(&self, timeout: Option<Duration>) -> Result<(), ServerError>;

    /// Wait for the server process to exit on its own
    async fn wait(&mut self) -> Result<ExitStatus, ServerError>;

    /// Stop the server and wait for it to exit
    ///
    /// Consumes self to ensure the server can only be stopped once.
    async fn stop(self) -> Result<ExitStatus, ServerError>
    where
        Self: Sized;
}

/// Trait for launching inference servers
pub trait ServerLauncher: Send + Sync {
    /// The type of server this launcher creates
    type Server: InferenceServer;

    /// Configuration required to start the server
    type Config;

    /// Start a new server instance with the given configuration
    fn start(config: &Self::Config) -> Result<Self::Server, ServerError>;
}

/// Trait for making sure a model is available locally
#[async_trait]
pub trait ModelManager: Send + Sync {
    /// Check if a model is already downloaded
    async fn is_downloaded(&self, model: &str) -> Result<bool, ServerError>;

    /// Download a model
    async fn download(&self, model: &str) -> Result<(), ServerError>;

    /// Ensure a model is available, downloading if necessary
    ///
    /// Returns `true` if a download took place.
    async fn ensure_model(&self, model: &str) -> Result<bool, ServerError> {
        if self.is_downloaded(model).await? {
            Ok(false)
        } else {
            self.download(model).await?;
            Ok(true)
        }
    }
}
