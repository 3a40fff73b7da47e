//! Velatura command-line entry point.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, handle_gateway_command, handle_supervise_command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    velatura_core::init_tracing().map_err(anyhow::Error::msg)?;

    let cli = Cli::parse();
    match cli.command {
        Commands::Gateway {
            host,
            port,
            upstream,
        } => handle_gateway_command(host, port, upstream).await?,
        Commands::Supervise {
            model,
            port,
            binary,
            ready_timeout_secs,
        } => {
            let code = handle_supervise_command(model, port, binary, ready_timeout_secs).await?;
            std::process::exit(code);
        }
    }

    Ok(())
}
