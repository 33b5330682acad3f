//! Domain types for nodepulse.
//!
//! These types describe the wire payload pushed by node agents
//! (`NodeSample`), the running statistics maintained by the aggregator
//! (`CategoryStats`, `SampleStats`), and the per-node history record
//! (`NodeRecord`). All types are JSON-serializable.

use serde::{Deserialize, Serialize};

/// Stable node identifier, assigned externally.
pub type NodeId = String;

// ── Categories ─────────────────────────────────────────────────────

/// The four resource dimensions tracked independently per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Cpu,
    Memory,
    Disk,
    Network,
}

impl Category {
    /// All categories, in wire-id order. Iteration over this table is
    /// the only way "for every category" is expressed, so adding a
    /// variant forces every call site to handle it.
    pub const ALL: [Category; 4] = [
        Category::Cpu,
        Category::Memory,
        Category::Disk,
        Category::Network,
    ];

    /// Numeric id used on the admin wire (`PUT /api/v1/scoring/{id}/..`).
    pub fn wire_id(self) -> u8 {
        match self {
            Category::Cpu => 0,
            Category::Memory => 1,
            Category::Disk => 2,
            Category::Network => 3,
        }
    }

    /// Parse a wire id back into a category.
    pub fn from_wire_id(id: u8) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.wire_id() == id)
    }

    /// Index into per-category fixed tables.
    pub fn index(self) -> usize {
        self.wire_id() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Category::Cpu => "cpu",
            Category::Memory => "memory",
            Category::Disk => "disk",
            Category::Network => "network",
        }
    }
}

// ── Raw samples ────────────────────────────────────────────────────

/// CPU tick deltas over the probe window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuSample {
    pub valid: bool,
    pub user: u64,
    pub system: u64,
    pub idle: u64,
}

/// Memory byte counts at probe time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySample {
    pub valid: bool,
    pub total: u64,
    pub used: u64,
    pub cached: u64,
    pub free: u64,
}

/// Filesystem usage plus I/O operation deltas over the probe window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskSample {
    pub valid: bool,
    pub size_bytes: u64,
    pub used_bytes: u64,
    pub free_bytes: u64,
    pub reads_completed: u64,
    pub writes_completed: u64,
}

/// Network byte deltas over the probe window (single interface).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSample {
    pub valid: bool,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// One timestamped snapshot for a node — the ingest payload.
///
/// A category that could not be measured arrives zero-valued with
/// `valid: false` rather than omitted, so the statistics engine's
/// carry-forward rule applies uniformly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeSample {
    pub node_id: NodeId,
    /// Unix timestamp in milliseconds, stamped by the agent.
    pub timestamp_ms: u64,
    pub cpu: CpuSample,
    pub memory: MemorySample,
    pub disk: DiskSample,
    pub network: NetworkSample,
}

impl NodeSample {
    /// The value fed into a category's running statistics, plus its
    /// validity flag: CPU tracks the idle-tick delta, memory and disk
    /// track free bytes, network tracks the received-byte delta.
    pub fn category_value(&self, category: Category) -> (f64, bool) {
        match category {
            Category::Cpu => (self.cpu.idle as f64, self.cpu.valid),
            Category::Memory => (self.memory.free as f64, self.memory.valid),
            Category::Disk => (self.disk.free_bytes as f64, self.disk.valid),
            Category::Network => (self.network.rx_bytes as f64, self.network.valid),
        }
    }
}

// ── Running statistics ─────────────────────────────────────────────

/// Online count/mean/variance over the valid subsequence of one
/// category's samples.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryStats {
    /// Number of valid samples observed up to and including this entry.
    pub count: u64,
    pub mean: f64,
    pub variance: f64,
}

/// One `CategoryStats` per category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub cpu: CategoryStats,
    pub memory: CategoryStats,
    pub disk: CategoryStats,
    pub network: CategoryStats,
}

impl SampleStats {
    pub fn get(&self, category: Category) -> &CategoryStats {
        match category {
            Category::Cpu => &self.cpu,
            Category::Memory => &self.memory,
            Category::Disk => &self.disk,
            Category::Network => &self.network,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut CategoryStats {
        match category {
            Category::Cpu => &mut self.cpu,
            Category::Memory => &mut self.memory,
            Category::Disk => &mut self.disk,
            Category::Network => &mut self.network,
        }
    }
}

// ── Records ────────────────────────────────────────────────────────

/// One sample as stored: the raw snapshot plus the statistics derived
/// from it and the immediately preceding entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleEntry {
    pub raw: NodeSample,
    pub stats: SampleStats,
}

/// Per-node history. Entries are appended in arrival order and never
/// reordered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: NodeId,
    /// Cumulative time spent offline (inter-sample gaps above the
    /// threshold). Observability-only; not consumed by scoring.
    pub downtime_ms: u64,
    pub samples: Vec<SampleEntry>,
}

impl NodeRecord {
    pub fn new(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            downtime_ms: 0,
            samples: Vec::new(),
        }
    }

    /// The most recent entry, if any sample has arrived.
    pub fn latest(&self) -> Option<&SampleEntry> {
        self.samples.last()
    }
}
