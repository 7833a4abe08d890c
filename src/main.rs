//! Main entry point for the logs-api-loader CLI

use clap::Parser;
use logs_api_loader::cli::{log_directive, Cli};
use tracing::error;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_tracing(level: &str) {
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_directive(level)));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The log level may come from the config file, so load it first
    let config = cli.load_config();
    init_tracing(cli.log_level(config.as_ref().ok()));

    let result = match config {
        Ok(config) => cli.execute(&config).await.map_err(|e| anyhow::anyhow!(e)),
        Err(e) => {
            Err(anyhow::Error::new(e).context(format!("failed to load {}", cli.config.display())))
        }
    };

    if let Err(e) = result {
        error!("Command failed: {:#}", e);
        std::process::exit(1);
    }
}
