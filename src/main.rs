//! Signed-URL download proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Client ──▶ http server ──▶ dispatcher ──▶ path check ──▶ signature
//!                  │                                            │
//!                  ▼                                            ▼
//!            service endpoints                        backend resolver
//!            (/, /_/test, /_/health,                  (POST /api/fs/link)
//!             /_/metrics)                                       │
//!                                                               ▼
//!   Client ◀── header policy ◀── redirect follower ◀── upstream fetch
//!               (allow-list,      (≤ 5 hops, self-loop
//!                CORS, cache)      re-entry)
//!
//!   Cross-cutting: config cache + watcher, logging, metrics,
//!                  performance monitor, cache maintenance, shutdown
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use signed_proxy::config::watcher::ConfigWatcher;
use signed_proxy::config::{load_config, ConfigSource, ServerConfig};
use signed_proxy::http::HttpServer;
use signed_proxy::lifecycle::Shutdown;
use signed_proxy::net::load_tls_config;
use signed_proxy::observability::{init_logging, metrics};

#[derive(Parser)]
#[command(name = "signed-proxy", version)]
#[command(about = "Download proxy for signed file paths", long_about = None)]
struct Args {
    /// TOML configuration file; its [backend] section is watched for changes
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "signed-proxy starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        tls = config.listener.tls.is_some(),
        resolve_timeout_secs = config.timeouts.resolve_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
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

    let source = ConfigSource::Process {
        file: args.config.clone(),
    };
    let server = HttpServer::new(config.clone(), source)?;

    // Requests still answer 500 until the keys are fixed; warn early.
    if let Err(e) = server.config_cache().get() {
        tracing::warn!(error = %e, "Backend settings are incomplete");
    }

    let _watcher = match &args.config {
        Some(path) => Some(ConfigWatcher::new(path, server.config_cache()).run()?),
        None => None,
    };

    let shutdown = Arc::new(Shutdown::new());
    let trigger = shutdown.clone();
    tokio::spawn(async move { trigger.trigger_on_ctrl_c().await });

    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let rustls = load_tls_config(tls).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
