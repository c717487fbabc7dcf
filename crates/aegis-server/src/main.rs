//! Aegis gateway server binary
//!
//! Usage:
//! ```bash
//! # With a config file
//! OPENAI_API_KEY=sk-... aegis-server --config aegis.yaml
//!
//! # Defaults only (listens on 127.0.0.1:8080)
//! OPENAI_API_KEY=sk-... aegis-server
//! ```
//!
//! Test with:
//! ```bash
//! curl http://localhost:8080/api/v1/completions \
//!   -H "Content-Type: application/json" \
//!   -d '{"query": "Summarize the project status", "maxTokens": 200}'
//! ```

use aegis_server::{build_router, build_state, ServerConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Aegis - guarded LLM gateway
#[derive(Parser)]
#[command(name = "aegis-server")]
#[command(about = "Guarded gateway between clients and LLM providers", long_about = None)]
struct Cli {
    /// Path to configuration file (YAML or TOML)
    #[arg(short, long, value_name = "FILE", env = "AEGIS_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            ServerConfig::from_file(path)?
        }
        None => {
            info!("No configuration file given, using defaults");
            ServerConfig::default()
        }
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = build_state(&config).await?;
    let app = build_router(state);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, version = env!("CARGO_PKG_VERSION"), "Aegis gateway listening");
    axum::serve(listener, app).await?;

    Ok(())
}
