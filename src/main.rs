//! School website server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id / trace / metrics
//!                      │
//!                      ▼
//!                 security headers ─▶ CORS ─▶ general limiter (/api/)
//!                                              │
//!                                              ▼
//!                                         body parser
//!                                              │
//!              ┌───────────────┬───────────────┼───────────────┐
//!              ▼               ▼               ▼               ▼
//!        /api/config     /api/contact     /api/logo     static site
//!        /api/whatsapp   (contact limit)  (logo limit)  (index.html)
//!        /api/health
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use school_site::config::load_config;
use school_site::http::HttpServer;
use school_site::lifecycle::{signals, startup, Shutdown};
use school_site::observability::{logging, metrics};

#[derive(Parser, Debug)]
#[command(name = "school-site")]
#[command(about = "Static school website with contact, logo and config endpoints", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "SITE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the directory holding the website.
    #[arg(long)]
    site_root: Option<PathBuf>,

    /// Validate the configuration and exit.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is normal in production.
    let _ = dotenv::dotenv();

    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.listener.set_port(port);
    }
    if let Some(root) = cli.site_root {
        config.site.root = root;
    }

    logging::init_logging(&config.observability);
    tracing::info!("school-site v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.check {
        tracing::info!("Configuration is valid");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let grace = Duration::from_secs(config.timeouts.shutdown_grace_secs);
    let listener = startup::bind(&config).await?;

    let shutdown = Shutdown::new();
    let mut stop_requested = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config);
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    tokio::select! {
        finished = &mut server_task => {
            finished??;
            return Ok(());
        }
        _ = stop_requested.recv() => {}
    }

    match tokio::time::timeout(grace, server_task).await {
        Ok(finished) => finished??,
        Err(_) => tracing::warn!(
            grace_secs = grace.as_secs(),
            "In-flight requests did not finish in time, exiting"
        ),
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
