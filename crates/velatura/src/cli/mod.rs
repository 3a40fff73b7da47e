//! Command-line interface module.
//!
//! This module provides the CLI structure and command handlers for the velatura binary.

mod commands;
mod gateway;
mod supervise;

pub use commands::{Cli, Commands};
pub use gateway::handle_gateway_command;
pub use supervise::handle_supervise_command;
