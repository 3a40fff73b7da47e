//! Process-wide configuration for the gateway and the Ollama supervisor.

use derive_getters::Getters;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use velatura_error::ConfigError;

/// Default Ollama base URL.
pub const DEFAULT_UPSTREAM_URL: &str = "http://localhost:11434";
/// Default model used when a request names none.
pub const DEFAULT_MODEL: &str = "deepseek-r1";
/// Default gateway port.
pub const DEFAULT_GATEWAY_PORT: u16 = 8000;
/// Default Ollama port.
pub const DEFAULT_OLLAMA_PORT: u16 = 11434;

/// Origins allowed to call the gateway from a browser.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AllowedOrigins {
    /// Any origin (`*`)
    #[default]
    Any,
    /// An explicit list of origins
    List(Vec<String>),
}

impl AllowedOrigins {
    /// Parses a comma-separated origin list; `*` anywhere means any origin.
    ///
    /// # Examples
    ///
    /// ```
    /// use velatura_server::AllowedOrigins;
    ///
    /// let origins = AllowedOrigins::parse("http://a.test, http://b.test");
    /// assert_eq!(
    ///     origins,
    ///     AllowedOrigins::List(vec!["http://a.test".into(), "http://b.test".into()])
    /// );
    /// assert_eq!(AllowedOrigins::parse("*"), AllowedOrigins::Any);
    /// ```
    pub fn parse(raw: &str) -> Self {
        let origins: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        if origins.is_empty() || origins.iter().any(|origin| origin == "*") {
            AllowedOrigins::Any
        } else {
            AllowedOrigins::List(origins)
        }
    }
}

/// Gateway configuration, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct GatewayConfig {
    /// Base URL of the Ollama server (e.g., "http://localhost:11434")
    #[builder(default = "DEFAULT_UPSTREAM_URL.to_string()")]
    upstream_base_url: String,
    /// Model used when a request does not name one
    #[builder(default = "DEFAULT_MODEL.to_string()")]
    default_model: String,
    /// Origins allowed by CORS
    #[builder(default)]
    allowed_origins: AllowedOrigins,
    /// Address the gateway listens on
    #[builder(default = "SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_GATEWAY_PORT)")]
    bind_addr: SocketAddr,
}

impl GatewayConfig {
    /// Returns a builder with every field defaulted.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::default()
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - `OLLAMA_BASE_URL` (default: "http://localhost:11434")
    /// - `OLLAMA_MODEL` (default: "deepseek-r1")
    /// - `ALLOWED_ORIGINS` (default: "*")
    /// - `GATEWAY_HOST` (default: "0.0.0.0")
    /// - `GATEWAY_PORT` (default: 8000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstream_base_url = lookup("OLLAMA_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
        let default_model = lookup("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let allowed_origins = lookup("ALLOWED_ORIGINS")
            .map(|raw| AllowedOrigins::parse(&raw))
            .unwrap_or_default();

        let host: IpAddr = match lookup("GATEWAY_HOST") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::new(format!("GATEWAY_HOST is not an IP address: {}", raw)))?,
            None => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        };
        let port = parse_port(lookup("GATEWAY_PORT"), "GATEWAY_PORT", DEFAULT_GATEWAY_PORT)?;

        Self::builder()
            .upstream_base_url(upstream_base_url)
            .default_model(default_model)
            .allowed_origins(allowed_origins)
            .bind_addr(SocketAddr::new(host, port))
            .build()
            .map_err(|e| ConfigError::new(e.to_string()))
    }
}

/// Ollama supervisor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Getters, derive_builder::Builder)]
#[builder(setter(into))]
pub struct SupervisorConfig {
    /// Model pulled on first run
    #[builder(default = "DEFAULT_MODEL.to_string()")]
    model: String,
    /// Port Ollama listens on
    #[builder(default = "DEFAULT_OLLAMA_PORT")]
    port: u16,
    /// Ollama executable
    #[builder(default = "\"ollama\".to_string()")]
    binary: String,
    /// Delay between readiness probes
    #[builder(default = "Duration::from_secs(1)")]
    poll_interval: Duration,
    /// Give up waiting for readiness after this long; `None` waits forever
    #[builder(default)]
    ready_timeout: Option<Duration>,
}

impl SupervisorConfig {
    /// Returns a builder with every field defaulted.
    pub fn builder() -> SupervisorConfigBuilder {
        SupervisorConfigBuilder::default()
    }

    /// Create config from environment variables
    ///
    /// Reads:
    /// - `OLLAMA_MODEL` (default: "deepseek-r1")
    /// - `OLLAMA_PORT` (default: 11434)
    /// - `OLLAMA_BIN` (default: "ollama")
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();
        if let Some(model) = lookup("OLLAMA_MODEL") {
            builder.model(model);
        }
        if let Some(binary) = lookup("OLLAMA_BIN") {
            builder.binary(binary);
        }
        builder.port(parse_port(
            lookup("OLLAMA_PORT"),
            "OLLAMA_PORT",
            DEFAULT_OLLAMA_PORT,
        )?);

        builder.build().map_err(|e| ConfigError::new(e.to_string()))
    }
}

fn parse_port(raw: Option<String>, key: &str, default: u16) -> Result<u16, ConfigError> {
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::new(format!("{} is not a valid port: {}", key, raw))),
        None => Ok(default),
    }
}
