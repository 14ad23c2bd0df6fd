use std::{net::SocketAddr, path::PathBuf};

use batch_sort_server::{config::ServerConfig, server};
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "batch-sort-server", version, about)]
struct Args {
    /// YAML config file. All fields are optional.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `listen_addr` from the config file.
    #[arg(long)]
    listen_addr: Option<SocketAddr>,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format);

    let mut cfg = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(addr) = args.listen_addr {
        cfg.listen_addr = addr;
    }

    tracing::info!(
        config = ?args.config,
        listen_addr = %cfg.listen_addr,
        max_parallel_workers = ?cfg.max_parallel_workers,
        "starting"
    );

    server::run(cfg).await
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}
