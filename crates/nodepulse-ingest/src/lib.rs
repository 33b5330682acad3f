//! nodepulse-ingest — the serialized sample pipeline.
//!
//! All accepted samples, from all nodes, funnel through one consumer
//! task draining an unbounded channel. That single consumer is what
//! guarantees no two record mutations race: interleaving is FIFO-fair
//! across nodes, at the cost of cluster-wide (not per-node) write
//! serialization. There is no backpressure beyond ordinary queuing.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use nodepulse_model::{NodeSample, SampleEntry};
use nodepulse_stats::{track_offline, update_latest, DEFAULT_OFFLINE_THRESHOLD};
use nodepulse_store::RecordStore;

/// Errors surfaced to ingest callers.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The consumer task has shut down; the sample was dropped.
    #[error("ingest pipeline is closed")]
    Closed,
}

/// Tunables for the consumer.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Inter-sample gap above which a node counts as having been offline.
    pub offline_threshold: Duration,
    /// Cap on retained entries per node. `None` keeps the full history
    /// for the process lifetime (unbounded growth).
    pub max_samples: Option<usize>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            offline_threshold: DEFAULT_OFFLINE_THRESHOLD,
            max_samples: None,
        }
    }
}

/// Cloneable submission handle held by the HTTP layer.
#[derive(Clone)]
pub struct IngestHandle {
    tx: mpsc::UnboundedSender<NodeSample>,
}

impl IngestHandle {
    /// Queue a sample for the consumer. Succeeds as long as the
    /// consumer is alive; ordering is the arrival order at this channel.
    pub fn submit(&self, sample: NodeSample) -> Result<(), IngestError> {
        self.tx.send(sample).map_err(|_| IngestError::Closed)
    }
}

/// Spawn the single consumer task. Returns the submission handle and
/// the task handle; the task exits when the shutdown signal flips or
/// every `IngestHandle` is dropped.
pub fn start(
    store: RecordStore,
    config: IngestConfig,
    mut shutdown: watch::Receiver<bool>,
) -> (IngestHandle, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<NodeSample>();

    let handle = tokio::spawn(async move {
        info!(
            offline_threshold_ms = config.offline_threshold.as_millis() as u64,
            max_samples = config.max_samples,
            "ingest consumer started"
        );
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        // Accepted samples are never dropped: drain
                        // whatever is still queued before exiting.
                        let mut drained = 0usize;
                        while let Ok(sample) = rx.try_recv() {
                            apply_sample(&store, &config, sample).await;
                            drained += 1;
                        }
                        info!(drained, "ingest consumer shutting down");
                        break;
                    }
                }
                sample = rx.recv() => {
                    match sample {
                        Some(sample) => apply_sample(&store, &config, sample).await,
                        None => {
                            info!("ingest channel closed, consumer exiting");
                            break;
                        }
                    }
                }
            }
        }
    });

    (IngestHandle { tx }, handle)
}

/// Process one sample: fetch-or-create the record, append the entry,
/// account offline time, advance the running statistics, then persist.
///
/// Only the single consumer calls this, so the read-modify-write over
/// `get_or_create`/`save` cannot race with another mutation.
pub async fn apply_sample(store: &RecordStore, config: &IngestConfig, sample: NodeSample) {
    let node_id = sample.node_id.clone();
    let (mut record, existed) = store.get_or_create(&node_id).await;
    if !existed {
        debug!(node_id = %node_id, "first sample for node");
    }

    record.samples.push(SampleEntry {
        raw: sample,
        stats: Default::default(),
    });

    track_offline(&mut record, config.offline_threshold);
    update_latest(&mut record);

    // Trim after the recurrence ran; it only ever reads the final entry.
    if let Some(cap) = config.max_samples {
        if cap > 0 && record.samples.len() > cap {
            let excess = record.samples.len() - cap;
            record.samples.drain(..excess);
            debug!(node_id = %node_id, dropped = excess, cap, "history trimmed to retention cap");
        }
    }

    store.save(&node_id, record).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodepulse_model::{CpuSample, NodeSample};

    fn cpu_sample(node_id: &str, timestamp_ms: u64, idle: u64) -> NodeSample {
        NodeSample {
            node_id: node_id.to_string(),
            timestamp_ms,
            cpu: CpuSample {
                valid: true,
                user: 5,
                system: 5,
                idle,
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn apply_sample_builds_record_incrementally() {
        let store = RecordStore::new();
        let config = IngestConfig::default();

        for (i, idle) in [90u64, 92, 88].into_iter().enumerate() {
            apply_sample(&store, &config, cpu_sample("n1", 1000 * (i as u64 + 1), idle)).await;
        }

        let (record, existed) = store.get_or_create("n1").await;
        assert!(existed);
        assert_eq!(record.samples.len(), 3);

        let cpu = record.latest().unwrap().stats.cpu;
        assert_eq!(cpu.count, 3);
        assert_eq!(cpu.mean, 90.0);
        assert!((cpu.variance - 14.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn apply_sample_accumulates_downtime() {
        let store = RecordStore::new();
        let config = IngestConfig::default();

        apply_sample(&store, &config, cpu_sample("n1", 1000, 90)).await;
        apply_sample(&store, &config, cpu_sample("n1", 11_000, 90)).await;

        let (record, _) = store.get_or_create("n1").await;
        assert_eq!(record.downtime_ms, 10_000);
    }

    #[tokio::test]
    async fn retention_cap_drops_oldest_entries() {
        let store = RecordStore::new();
        let config = IngestConfig {
            max_samples: Some(2),
            ..Default::default()
        };

        for i in 0..5u64 {
            apply_sample(&store, &config, cpu_sample("n1", 1000 * (i + 1), 90 + i)).await;
        }

        let (record, _) = store.get_or_create("n1").await;
        assert_eq!(record.samples.len(), 2);
        // The recurrence survived the trims: 5 valid samples counted.
        assert_eq!(record.latest().unwrap().stats.cpu.count, 5);
        assert_eq!(record.latest().unwrap().raw.timestamp_ms, 5000);
    }

    #[tokio::test]
    async fn consumer_drains_submissions_in_order() {
        let store = RecordStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = start(store.clone(), IngestConfig::default(), shutdown_rx);

        for i in 0..10u64 {
            handle
                .submit(cpu_sample("n1", 1000 + i, 90))
                .expect("consumer alive");
        }

        // Dropping the handle closes the channel; the consumer drains
        // what was queued and exits.
        drop(handle);
        task.await.unwrap();

        let (record, _) = store.get_or_create("n1").await;
        assert_eq!(record.samples.len(), 10);
        let timestamps: Vec<u64> = record.samples.iter().map(|e| e.raw.timestamp_ms).collect();
        assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
        drop(shutdown_tx);
    }

    #[tokio::test]
    async fn shutdown_drains_already_queued_samples() {
        let store = RecordStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = start(store.clone(), IngestConfig::default(), shutdown_rx);

        for i in 0..20u64 {
            handle
                .submit(cpu_sample("n1", 1000 + i, 90))
                .expect("consumer alive");
        }

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        let (record, _) = store.get_or_create("n1").await;
        assert_eq!(record.samples.len(), 20);
    }

    #[tokio::test]
    async fn submit_after_shutdown_reports_closed() {
        let store = RecordStore::new();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (handle, task) = start(store, IngestConfig::default(), shutdown_rx);

        shutdown_tx.send(true).unwrap();
        task.await.unwrap();

        assert!(matches!(
            handle.submit(cpu_sample("n1", 1000, 90)),
            Err(IngestError::Closed)
        ));
    }
}
