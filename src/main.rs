//! Gmail MCP Gateway
//!
//! A Model Context Protocol (MCP) gateway in front of the Gmail API.
//! Callers bring their own Google OAuth bearer tokens; the gateway verifies
//! them per call and relays sends to Gmail.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};

use gmail_mcp_gateway::config::{Config, TransportMode};
use gmail_mcp_gateway::context::AppContext;
use gmail_mcp_gateway::error::Result;
use gmail_mcp_gateway::mcp::http;
use gmail_mcp_gateway::mcp::server::McpServer;

/// Gmail MCP Gateway
#[derive(Parser)]
#[command(name = "gmail-mcp-gateway")]
#[command(author, version, about = "MCP gateway that sends Gmail for OAuth-authenticated callers")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate the environment and print the resolved deployment contract
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Check) => {
            print_contract(&config);
            Ok(())
        }
        None => run(config).await,
    }
}

/// Print the deployment contract the environment resolves to.
fn print_contract(config: &Config) {
    println!("transport: {}", config.transport.as_str());
    if config.transport == TransportMode::Http {
        println!("bind: {}", config.bind_addr());
        println!("base url: {}", config.base_url);
    }
    println!("auth: {}", config.auth.label());
    if config.auth.is_anonymous() {
        println!("degraded: gmail tools will reject every call");
    }
    println!(
        "static token: {}",
        if config.static_token.is_some() {
            "set"
        } else {
            "unset"
        }
    );
}

async fn run(config: Config) -> Result<()> {
    let ctx = Arc::new(AppContext::new(config)?);

    info!(
        transport = ctx.config.transport.as_str(),
        auth = ctx.config.auth.label(),
        "starting gateway"
    );
    if ctx.is_degraded() {
        warn!(
            "running without OAuth credentials: callers cannot authenticate \
             and gmail tools will reject every call"
        );
    }

    let server = Arc::new(McpServer::new(ctx.clone()));
    match ctx.config.transport {
        TransportMode::Http => http::serve(server).await,
        TransportMode::Stdio => server.run_stdio().await,
    }
}
