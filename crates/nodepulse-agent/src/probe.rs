//! Category probes over procfs and statvfs.
//!
//! Each probe reads raw OS counters and reports them in the shape the
//! aggregator's statistics engine expects: tick/byte deltas for the
//! rate categories, point-in-time byte counts for memory and disk
//! usage. The text parsers are split out as pure functions so they can
//! be tested against literal procfs content.

use std::time::Duration;

use thiserror::Error;
use tokio::fs;

use nodepulse_model::{CpuSample, DiskSample, MemorySample, NetworkSample};

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("{kind} {name:?} not found")]
    NotFound { kind: &'static str, name: String },
}

// ── CPU ────────────────────────────────────────────────────────

/// Aggregate CPU tick counters from the `cpu ` summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuTicks {
    pub user: u64,
    pub system: u64,
    pub idle: u64,
}

/// Parse the aggregate `cpu ` line of `/proc/stat`. `nice` time counts
/// as user time.
pub fn parse_proc_stat(raw: &str) -> Result<CpuTicks, ProbeError> {
    let line = raw
        .lines()
        .find_map(|l| l.strip_prefix("cpu "))
        .ok_or(ProbeError::Malformed("/proc/stat"))?;
    let fields: Vec<u64> = line
        .split_whitespace()
        .filter_map(|s| s.parse().ok())
        .collect();
    if fields.len() < 4 {
        return Err(ProbeError::Malformed("/proc/stat"));
    }
    Ok(CpuTicks {
        user: fields[0] + fields[1],
        system: fields[2],
        idle: fields[3],
    })
}

/// Two readings of `/proc/stat` a window apart; reports tick deltas.
pub async fn cpu(window: Duration) -> Result<CpuSample, ProbeError> {
    let before = parse_proc_stat(&fs::read_to_string("/proc/stat").await?)?;
    tokio::time::sleep(window).await;
    let after = parse_proc_stat(&fs::read_to_string("/proc/stat").await?)?;

    Ok(CpuSample {
        valid: true,
        user: after.user.saturating_sub(before.user),
        system: after.system.saturating_sub(before.system),
        idle: after.idle.saturating_sub(before.idle),
    })
}

// ── Memory ─────────────────────────────────────────────────────

/// Parse `MemTotal`, `MemFree` and `Cached` out of `/proc/meminfo`
/// (values are reported in kB). Used memory is what remains after
/// free and cached.
pub fn parse_meminfo(raw: &str) -> Result<MemorySample, ProbeError> {
    let mut total = None;
    let mut free = None;
    let mut cached = None;

    for line in raw.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = Some(kb * 1024),
            "MemFree:" => free = Some(kb * 1024),
            "Cached:" if cached.is_none() => cached = Some(kb * 1024),
            _ => {}
        }
    }

    let (Some(total), Some(free)) = (total, free) else {
        return Err(ProbeError::Malformed("/proc/meminfo"));
    };
    let cached = cached.unwrap_or(0);

    Ok(MemorySample {
        valid: true,
        total,
        used: total.saturating_sub(free).saturating_sub(cached),
        cached,
        free,
    })
}

/// Point-in-time memory counters.
pub async fn memory() -> Result<MemorySample, ProbeError> {
    parse_meminfo(&fs::read_to_string("/proc/meminfo").await?)
}

// ── Disk ───────────────────────────────────────────────────────

/// Completed read/write operation counters for one block device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiskOps {
    pub reads_completed: u64,
    pub writes_completed: u64,
}

/// Find a device's completed-operation counters in `/proc/diskstats`
/// (fields 4 and 8 of its line).
pub fn parse_diskstats(raw: &str, device: &str) -> Result<DiskOps, ProbeError> {
    for line in raw.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() >= 8 && fields[2] == device {
            let reads = fields[3]
                .parse()
                .map_err(|_| ProbeError::Malformed("/proc/diskstats"))?;
            let writes = fields[7]
                .parse()
                .map_err(|_| ProbeError::Malformed("/proc/diskstats"))?;
            return Ok(DiskOps {
                reads_completed: reads,
                writes_completed: writes,
            });
        }
    }
    Err(ProbeError::NotFound {
        kind: "disk device",
        name: device.to_string(),
    })
}

/// Filesystem size/free/used of a mount path via `statvfs(3)`.
fn filesystem_usage(path: &str) -> Result<(u64, u64, u64), ProbeError> {
    let c_path = std::ffi::CString::new(path)
        .map_err(|_| ProbeError::Malformed("mount path"))?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    // SAFETY: c_path is a valid NUL-terminated string and stat is a
    // properly sized out-parameter.
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return Err(ProbeError::Io(std::io::Error::last_os_error()));
    }

    let frsize = stat.f_frsize as u64;
    let size = stat.f_blocks as u64 * frsize;
    let free = stat.f_bfree as u64 * frsize;
    Ok((size, size.saturating_sub(free), free))
}

/// Filesystem usage plus operation deltas over the window.
pub async fn disk(device: &str, mount_path: &str, window: Duration) -> Result<DiskSample, ProbeError> {
    let before = parse_diskstats(&fs::read_to_string("/proc/diskstats").await?, device)?;
    tokio::time::sleep(window).await;
    let after = parse_diskstats(&fs::read_to_string("/proc/diskstats").await?, device)?;

    let (size_bytes, used_bytes, free_bytes) = filesystem_usage(mount_path)?;

    Ok(DiskSample {
        valid: true,
        size_bytes,
        used_bytes,
        free_bytes,
        reads_completed: after.reads_completed.saturating_sub(before.reads_completed),
        writes_completed: after.writes_completed.saturating_sub(before.writes_completed),
    })
}

// ── Network ────────────────────────────────────────────────────

/// Byte counters for one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetCounters {
    pub rx_bytes: u64,
    pub tx_bytes: u64,
}

/// Find an interface's rx/tx byte counters in `/proc/net/dev`.
pub fn parse_net_dev(raw: &str, interface: &str) -> Result<NetCounters, ProbeError> {
    for line in raw.lines() {
        let Some((name, counters)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != interface {
            continue;
        }
        let fields: Vec<&str> = counters.split_whitespace().collect();
        if fields.len() < 9 {
            return Err(ProbeError::Malformed("/proc/net/dev"));
        }
        let rx = fields[0]
            .parse()
            .map_err(|_| ProbeError::Malformed("/proc/net/dev"))?;
        let tx = fields[8]
            .parse()
            .map_err(|_| ProbeError::Malformed("/proc/net/dev"))?;
        return Ok(NetCounters {
            rx_bytes: rx,
            tx_bytes: tx,
        });
    }
    Err(ProbeError::NotFound {
        kind: "interface",
        name: interface.to_string(),
    })
}

/// Two readings of the interface counters a window apart; reports
/// byte deltas.
pub async fn network(interface: &str, window: Duration) -> Result<NetworkSample, ProbeError> {
    let before = parse_net_dev(&fs::read_to_string("/proc/net/dev").await?, interface)?;
    tokio::time::sleep(window).await;
    let after = parse_net_dev(&fs::read_to_string("/proc/net/dev").await?, interface)?;

    Ok(NetworkSample {
        valid: true,
        rx_bytes: after.rx_bytes.saturating_sub(before.rx_bytes),
        tx_bytes: after.tx_bytes.saturating_sub(before.tx_bytes),
    })
}
