//! Supervisor command handler.

use std::time::Duration;
use velatura_error::{ConfigError, VelaturaResult};
use velatura_server::SupervisorConfig;

/// Handle the `supervise` command
///
/// Returns the exit code of the Ollama process.
pub async fn handle_supervise_command(
    model: Option<String>,
    port: Option<u16>,
    binary: Option<String>,
    ready_timeout_secs: Option<u64>,
) -> VelaturaResult<i32> {
    let env = SupervisorConfig::from_env()?;

    let config = SupervisorConfig::builder()
        .model(model.unwrap_or_else(|| env.model().clone()))
        .port(port.unwrap_or(*env.port()))
        .binary(binary.unwrap_or_else(|| env.binary().clone()))
        .ready_timeout(ready_timeout_secs.map(Duration::from_secs))
        .build()
        .map_err(|e| ConfigError::new(e.to_string()))?;

    tracing::info!(model = %config.model(), port = config.port(), "Starting Ollama supervisor");
    Ok(velatura_server::supervise(&config).await?)
}
