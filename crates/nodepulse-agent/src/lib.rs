//! nodepulse-agent — the node-side sample source.
//!
//! Runs four category probes concurrently, joins them into one
//! snapshot, and pushes the snapshot to the aggregator once per tick.
//! A probe that fails marks only its own category invalid; the
//! snapshot is always fully populated so the aggregator's carry-forward
//! rule applies uniformly.
//!
//! Rate categories (CPU ticks, disk ops, network bytes) take two
//! counter readings separated by a fixed window, so a full snapshot
//! has an inherent ~1s minimum latency.

pub mod client;
pub mod probe;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use nodepulse_model::NodeSample;

/// Window between the two counter readings of rate probes.
pub const PROBE_WINDOW: Duration = Duration::from_secs(1);

/// Agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Stable node identifier reported with every sample.
    pub node_id: String,
    /// Aggregator authority, `host:port`.
    pub aggregator: String,
    /// Sleep between push cycles (on top of the probe window).
    pub interval: Duration,
    /// Block device watched for I/O operation counts, e.g. `sda`.
    pub disk_device: String,
    /// Network interface watched for byte counters, e.g. `eth0`.
    pub net_interface: String,
    /// Mount path measured for filesystem usage.
    pub mount_path: String,
}

/// Collect one snapshot: all four probes in parallel, joined here.
/// Never fails as a whole — each failed probe logs and leaves its
/// category zero-valued with `valid: false`.
pub async fn collect(config: &AgentConfig) -> NodeSample {
    let (cpu, memory, disk, network) = tokio::join!(
        probe::cpu(PROBE_WINDOW),
        probe::memory(),
        probe::disk(&config.disk_device, &config.mount_path, PROBE_WINDOW),
        probe::network(&config.net_interface, PROBE_WINDOW),
    );

    let mut sample = NodeSample {
        node_id: config.node_id.clone(),
        timestamp_ms: now_ms(),
        ..Default::default()
    };

    match cpu {
        Ok(cpu) => sample.cpu = cpu,
        Err(e) => warn!(error = %e, "cpu probe failed"),
    }
    match memory {
        Ok(memory) => sample.memory = memory,
        Err(e) => warn!(error = %e, "memory probe failed"),
    }
    match disk {
        Ok(disk) => sample.disk = disk,
        Err(e) => warn!(error = %e, "disk probe failed"),
    }
    match network {
        Ok(network) => sample.network = network,
        Err(e) => warn!(error = %e, "network probe failed"),
    }

    sample
}

/// Collect-and-push loop. Push failures are logged and skipped; the
/// next tick is the retry.
pub async fn run(config: AgentConfig, mut shutdown: watch::Receiver<bool>) {
    info!(
        node_id = %config.node_id,
        aggregator = %config.aggregator,
        interval_ms = config.interval.as_millis() as u64,
        "agent loop started"
    );

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("agent loop shutting down");
                    return;
                }
            }
            _ = tokio::time::sleep(config.interval) => {
                let sample = collect(&config).await;
                match client::push_sample(&config.aggregator, &sample).await {
                    Ok(()) => debug!(timestamp_ms = sample.timestamp_ms, "sample pushed"),
                    Err(e) => warn!(error = %e, "push failed, retrying next tick"),
                }
            }
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
