//! pulsed — the nodepulse daemon.
//!
//! Two modes in one binary:
//! - `serve`: the aggregator — record store, serialized ingest
//!   consumer, scoring engine, and the REST/extender API.
//! - `agent`: the node-side probe-and-push loop.
//!
//! # Usage
//!
//! ```text
//! pulsed serve --port 8080
//! pulsed agent --node-id worker-1 --aggregator 10.0.0.5:8080
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use nodepulse_ingest::IngestConfig;
use nodepulse_scoring::ScoringEngine;
use nodepulse_store::RecordStore;

#[derive(Parser)]
#[command(name = "pulsed", about = "nodepulse daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the aggregator.
    Serve {
        /// Port to listen on.
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Inter-sample gap (seconds) above which a node counts as offline.
        #[arg(long, default_value = "5")]
        offline_threshold_secs: u64,

        /// Ceiling for the network score, received bytes per window.
        #[arg(long, default_value = "1048576")]
        max_rx_per_second: f64,

        /// Retained samples per node; 0 keeps the full history.
        #[arg(long, default_value = "0")]
        max_samples: usize,
    },
    /// Run the node agent.
    Agent {
        /// Stable node identifier reported with every sample.
        #[arg(long)]
        node_id: String,

        /// Aggregator authority, host:port.
        #[arg(long, default_value = "127.0.0.1:8080")]
        aggregator: String,

        /// Sleep between push cycles in seconds.
        #[arg(long, default_value = "1")]
        interval_secs: u64,

        /// Block device watched for I/O operation counts.
        #[arg(long, default_value = "sda")]
        disk_device: String,

        /// Network interface watched for byte counters.
        #[arg(long, default_value = "eth0")]
        net_interface: String,

        /// Mount path measured for filesystem usage.
        #[arg(long, default_value = "/")]
        mount_path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pulsed=debug,nodepulse=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            offline_threshold_secs,
            max_rx_per_second,
            max_samples,
        } => {
            run_serve(port, offline_threshold_secs, max_rx_per_second, max_samples).await
        }
        Command::Agent {
            node_id,
            aggregator,
            interval_secs,
            disk_device,
            net_interface,
            mount_path,
        } => {
            let config = nodepulse_agent::AgentConfig {
                node_id,
                aggregator,
                interval: Duration::from_secs(interval_secs),
                disk_device,
                net_interface,
                mount_path,
            };
            run_agent(config).await
        }
    }
}

async fn run_serve(
    port: u16,
    offline_threshold_secs: u64,
    max_rx_per_second: f64,
    max_samples: usize,
) -> anyhow::Result<()> {
    info!("nodepulse aggregator starting");

    let store = RecordStore::new();
    let scoring = Arc::new(ScoringEngine::new(max_rx_per_second));
    info!(max_rx_per_second, "scoring engine initialized");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let ingest_config = IngestConfig {
        offline_threshold: Duration::from_secs(offline_threshold_secs),
        max_samples: (max_samples > 0).then_some(max_samples),
    };
    let (ingest, consumer) = nodepulse_ingest::start(store.clone(), ingest_config, shutdown_rx);

    let router = nodepulse_api::build_router(store, ingest, scoring);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "API server starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Server is down; stop the consumer and let it drain.
    let _ = shutdown_tx.send(true);
    consumer.await?;
    info!("aggregator stopped");
    Ok(())
}

async fn run_agent(config: nodepulse_agent::AgentConfig) -> anyhow::Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let agent = tokio::spawn(nodepulse_agent::run(config, shutdown_rx));

    shutdown_signal().await;
    let _ = shutdown_tx.send(true);
    agent.await?;
    info!("agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
