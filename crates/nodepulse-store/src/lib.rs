//! nodepulse-store — the in-memory record store.
//!
//! Owns the node-id → history mapping behind a single process-wide
//! `RwLock`: writes (the ingest consumer) are exclusive, reads (the
//! scoring path) are shared, and no reader ever observes a partially
//! written record because `save` replaces the whole record at once.
//!
//! Records are created lazily on first sample and live for the process
//! lifetime; there is no deletion. Persistence across restarts is
//! intentionally out of scope.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use nodepulse_model::{NodeId, NodeRecord, SampleEntry};

/// Cheaply cloneable handle to the shared record map.
#[derive(Clone, Default)]
pub struct RecordStore {
    records: Arc<RwLock<HashMap<NodeId, NodeRecord>>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a clone of a node's record, or a zero-valued record when
    /// the id is unseen. Returns whether the record existed. Nothing
    /// is inserted until `save` is called.
    pub async fn get_or_create(&self, id: &str) -> (NodeRecord, bool) {
        let records = self.records.read().await;
        match records.get(id) {
            Some(record) => (record.clone(), true),
            None => (NodeRecord::new(id), false),
        }
    }

    /// Atomically replace a node's stored record.
    pub async fn save(&self, id: &str, record: NodeRecord) {
        let mut records = self.records.write().await;
        if records.insert(id.to_string(), record).is_none() {
            debug!(node_id = %id, "record created");
        }
    }

    /// The latest sample entry for one node, if it has any.
    pub async fn latest(&self, id: &str) -> Option<SampleEntry> {
        let records = self.records.read().await;
        records.get(id).and_then(|r| r.latest().cloned())
    }

    /// The latest sample entry of every node, with its accumulated
    /// downtime. Snapshot-of-snapshots consistency: entries are read
    /// under one shared lock acquisition.
    pub async fn all_latest(&self) -> Vec<(SampleEntry, u64)> {
        let records = self.records.read().await;
        records
            .values()
            .filter_map(|r| r.latest().map(|e| (e.clone(), r.downtime_ms)))
            .collect()
    }

    /// Number of nodes ever seen.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}
