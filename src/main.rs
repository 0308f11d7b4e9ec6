//! Tax and benefit system web API.
//!
//! A JSON HTTP facade over an external microsimulation engine, built with
//! Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                   WEB API                        │
//!                    │                                                  │
//!   Client Request   │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ─────────────────┼─▶│  http   │──▶│   cors   │──▶│   routing    │  │
//!                    │  │ server  │   │negotiator│   │  rule table  │  │
//!                    │  └─────────┘   └──────────┘   └──────┬───────┘  │
//!                    │                                      │          │
//!                    │                                      ▼          │
//!                    │  ┌─────────┐   ┌──────────┐   ┌──────────────┐  │
//!   Client Response  │  │envelope │◀──│ handlers │◀──│  admission   │  │
//!   ◀────────────────┼──│ builder │   │          │   │   control    │  │
//!                    │  └─────────┘   └────┬─────┘   └──────────────┘  │
//!                    │                     │                           │
//!                    │                     ▼                           │
//!                    │  ┌────────────────────────────────────────────┐ │
//!                    │  │   computation engine (external collaborator)│ │
//!                    │  └────────────────────────────────────────────┘ │
//!                    │                                                  │
//!                    │  Cross-cutting: config, context chain + i18n,   │
//!                    │  scenario cache, observability                  │
//!                    └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tax_benefit_api::config::{load_config, ApiConfig};
use tax_benefit_api::engine::demo::DemoEngine;
use tax_benefit_api::http::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "tax-benefit-api", about = "Tax and benefit system web API")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Surface internal error detail to clients.
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration before logging init so the level applies.
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if args.debug {
        config.engine.debug = true;
    }

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("tax_benefit_api={},tower_http=info", config.observability.log_level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tax-benefit-api starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        country_package = %config.engine.country_package,
        reforms = ?config.engine.reforms,
        debug = config.engine.debug,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => tax_benefit_api::observability::metrics::init_metrics(addr),
            Err(error) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %error,
                "Failed to parse metrics address"
            ),
        }
    }

    // The demo country package ships with the facade; real deployments
    // embed their country package behind the same trait.
    let engine = Arc::new(DemoEngine::new(config.engine.reforms.clone()));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config, engine);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
