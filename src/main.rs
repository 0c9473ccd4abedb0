//! Staking API server binary.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use staking_api::config::{load_config, ApiConfig};
use staking_api::http::ApiServer;
use staking_api::lifecycle::{self, signals, Shutdown};
use staking_api::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "staking-api")]
#[command(about = "Read-only dapps staking statistics API", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "STAKING_API_CONFIG")]
    config: Option<PathBuf>,

    /// Override the server bind address
    #[arg(long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ApiConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("staking-api v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.server.bind_address,
        default_network = %config.default_network,
        networks = config.networks.len(),
        request_timeout_secs = config.server.request_timeout_secs,
        register_timeout_secs = config.server.register_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = Arc::new(lifecycle::build_service(&config)?);
    let listener = lifecycle::bind_listener(&config).await?;

    let shutdown = Arc::new(Shutdown::new());
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        signals::wait_for_termination(&signal_shutdown).await;
    });

    let server = ApiServer::new(&config.server, service);
    server.run(listener, shutdown.wait()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
