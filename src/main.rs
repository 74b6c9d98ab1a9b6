//! Status mirror server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────┐
//!   Client request      │  http server ──▶ proxy dispatcher            │
//!   ───────────────────▶│                    │        │                │
//!                       │                    ▼        ▼                │
//!                       │               cache store  upstream client ─┼──▶ Status page
//!                       │                    ▲                         │
//!   Signed webhook      │  webhook ──▶ deployment trigger ──▶ git pull │
//!   ───────────────────▶│                    (clear cache)             │
//!                       └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tokio::net::TcpListener;

use status_mirror::config::{load_config, ProxyConfig};
use status_mirror::lifecycle::{assemble, signals, StartupError};
use status_mirror::observability::{logging, metrics};
use status_mirror::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "status-mirror", version)]
#[command(about = "Caching mirror for a status page with webhook deployments")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.config.as_deref().map(load_config).transpose() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("status-mirror: {e}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(&config.observability);

    match run(config).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            if let StartupError::Config(errors) = &e {
                for error in errors {
                    tracing::error!(%error, "Configuration error");
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ProxyConfig) -> Result<(), StartupError> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        cache_dir = %config.cache.dir.display(),
        webhook_path = %config.webhook.path,
        "status-mirror starting"
    );

    let state = assemble(&config).await?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    let shutdown = Shutdown::new();
    let server = HttpServer::new(&config, state);
    let serving = server.run(listener, shutdown.subscribe());
    tokio::pin!(serving);

    tokio::select! {
        result = &mut serving => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
            }
            return Ok(());
        }
        _ = signals::wait_for_signal() => shutdown.trigger(),
    }

    if let Err(e) = serving.await {
        tracing::error!(error = %e, "HTTP server failed during shutdown");
    }
    Ok(())
}
