use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use silence::config::{AppConfig, ConfigError, ServerConfig};

/// Silence broadcast relay
#[derive(Parser, Debug)]
#[command(name = "silence", version, about = "Real-time WebSocket broadcast relay")]
struct Cli {
    /// Listen address as host:port (":8080" keeps the configured host)
    #[arg(long)]
    addr: Option<String>,

    /// Emit structured JSON logs
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(error) => {
            init_tracing(&ServerConfig::default());
            tracing::error!(%error, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.server);
    tracing::info!("silence v{} starting", env!("CARGO_PKG_VERSION"));

    match silence::server::run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(%error, "Relay terminated");
            ExitCode::FAILURE
        }
    }
}

/// Environment (and `.env`) first, command-line flags on top.
fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = AppConfig::load()?;
    if let Some(addr) = &cli.addr {
        config.server.apply_addr(addr)?;
    }
    if cli.json_logs {
        config.server.json_logs = true;
    }
    Ok(config)
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&server.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if server.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
