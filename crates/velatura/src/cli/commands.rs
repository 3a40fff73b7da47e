//! Command-line definitions.

use clap::{Parser, Subcommand};
use std::net::IpAddr;

/// Velatura: Ollama plus a reasoning-markup stripping gateway.
#[derive(Debug, Parser)]
#[command(name = "velatura", version, about)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve the HTTP gateway in front of Ollama
    Gateway {
        /// Address to bind (overrides GATEWAY_HOST)
        #[arg(long)]
        host: Option<IpAddr>,
        /// Port to bind (overrides GATEWAY_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Ollama base URL (overrides OLLAMA_BASE_URL)
        #[arg(long)]
        upstream: Option<String>,
    },
    /// Start Ollama, pull the model on first run, and stay in the foreground
    Supervise {
        /// Model to pull (overrides OLLAMA_MODEL)
        #[arg(long)]
        model: Option<String>,
        /// Ollama port (overrides OLLAMA_PORT)
        #[arg(long)]
        port: Option<u16>,
        /// Ollama executable (overrides OLLAMA_BIN)
        #[arg(long)]
        binary: Option<String>,
        /// Give up if Ollama is not ready after this many seconds
        #[arg(long)]
        ready_timeout_secs: Option<u64>,
    },
}
