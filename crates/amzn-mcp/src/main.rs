//! amzn-mcp - Amazon order history MCP server
//!
//! Exposes Amazon order tools to AI assistants over stdio.

use anyhow::Result;
use clap::Parser;
use rmcp::{ServiceExt, transport::stdio};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod cli;
mod config;
mod mcp;
mod session;
mod state;

use cli::Cli;
use mcp::McpServer;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Credentials may live in a local .env file
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // stdout carries the MCP transport, so logs go to stderr
    let filter = EnvFilter::from_default_env()
        .add_directive("amzn_mcp=info".parse()?)
        .add_directive("amzn_core=info".parse()?);
    if cli.log_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    info!("amzn-mcp v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = config::Config::load();
    config.apply_cli(&cli);
    if let Err(e) = config.credentials() {
        warn!("{}; amazon_login will report CONFIG_ERROR", e);
    }

    let connector = config.connector()?;
    info!("Using {} backend", connector.name());

    let state = AppState::new(config, connector);
    let service = McpServer::new(state).serve(stdio()).await?;
    info!("MCP server ready on stdio");

    let reason = service.waiting().await?;
    info!("Shutting down ({:?})", reason);

    Ok(())
}
