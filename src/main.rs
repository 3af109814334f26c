//! api-telemetry service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request ──▶ http (request id, error boundary, probes) ──▶ handler
//!                                  │ on response close
//!                                  ▼
//!                        observability::ChannelRouter
//!                          │ console            │ file
//!                          ▼                    ▼
//!                  tracing fmt layer     per-channel writer task
//!                  (ConsoleFilter)       logs/{channel}/{date}.{log|yaml}
//!                                              │ day rollover / startup
//!                                              ▼
//!                                        gzip archival
//! ```
//!
//! # Exit Status
//! - `2`: the application config could not be loaded or failed validation
//! - `10 + code`: the logger settings code was rejected (codes 0 to 3)

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use api_telemetry::config::load_config;
use api_telemetry::http::HttpServer;
use api_telemetry::lifecycle::{spawn_signal_listener, start_logger, Shutdown};
use api_telemetry::observability::{logging::init_logging, metrics, LoggerSettings};

#[derive(Parser, Debug)]
#[command(name = "api-telemetry", version)]
#[command(about = "HTTP backend with multi-channel request logging", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "APP_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            std::process::exit(2);
        }
    };

    let settings = match LoggerSettings::parse(&config.logging.settings, config.logging.debug) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(e.exit_code());
        }
    };

    init_logging(&settings)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        log_dir = %config.logging.log_dir,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let logger = start_logger(&config.logging, settings).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config, logger.clone());
    server.run(listener, shutdown.subscribe()).await?;

    logger.flush().await;
    tracing::info!("Shutdown complete");
    Ok(())
}
