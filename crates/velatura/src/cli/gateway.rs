//! Gateway command handler.

use std::net::{IpAddr, SocketAddr};
use velatura_error::VelaturaResult;
use velatura_server::GatewayConfig;

/// Handle the `gateway` command
pub async fn handle_gateway_command(
    host: Option<IpAddr>,
    port: Option<u16>,
    upstream: Option<String>,
) -> VelaturaResult<()> {
    let config = GatewayConfig::from_env()?;

    let addr = SocketAddr::new(
        host.unwrap_or_else(|| config.bind_addr().ip()),
        port.unwrap_or_else(|| config.bind_addr().port()),
    );
    let config = GatewayConfig::builder()
        .upstream_base_url(upstream.unwrap_or_else(|| config.upstream_base_url().clone()))
        .default_model(config.default_model().clone())
        .allowed_origins(config.allowed_origins().clone())
        .bind_addr(addr)
        .build()
        .map_err(|e| velatura_error::ConfigError::new(e.to_string()))?;

    tracing::info!(
        upstream = %config.upstream_base_url(),
        model = %config.default_model(),
        "Starting gateway"
    );
    velatura_server::serve(config).await
}
