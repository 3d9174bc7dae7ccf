use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use filegate::config::{load_config, validate_config, ConfigError, GatewayConfig};
use filegate::net::tls::load_tls_config;
use filegate::observability::{logging, metrics};
use filegate::{Gateway, Shutdown};

/// Serve directories and upstreams over HTTP with per-path policies.
#[derive(Debug, Parser)]
#[command(name = "filegate", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root directory of every vhost.
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:8080.
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level when RUST_LOG is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Args {
    fn load(&self) -> Result<GatewayConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => GatewayConfig::default(),
        };
        if let Some(root) = &self.root {
            for vhost in &mut config.vhosts {
                vhost.root = root.clone();
            }
        }
        if let Some(listen) = &self.listen {
            config.listener.bind_address = listen.clone();
        }
        if let Some(level) = &self.log_level {
            config.observability.log_level = level.clone();
        }
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = args.load()?;

    logging::init(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "filegate starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    tracing::info!(
        bind_address = %config.listener.bind_address,
        vhosts = config.vhosts.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let tls = match &config.listener.tls {
        Some(tls) => Some(load_tls_config(tls).await?),
        None => None,
    };
    let bind_address = config.listener.bind_address.clone();
    let gateway = Gateway::new(config)?;

    let shutdown = Shutdown::new();
    let signals = shutdown.clone();
    tokio::spawn(async move { signals.listen_for_signals().await });

    match tls {
        Some(tls) => {
            let addr: SocketAddr = bind_address.parse()?;
            gateway.run_tls(addr, tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            gateway.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
