//! Parsers for the Linux `/proc` counter files the agent samples.
//!
//! Every function here takes the file contents rather than a path, so the
//! parsing can be exercised against fixed fixtures.

use crate::error::{AgentError, Result};

/// Bytes per sector in `/proc/diskstats`, independent of the device.
pub const SECTOR_SIZE: i64 = 512;

const STAT: &str = "/proc/stat";
const MEMINFO: &str = "/proc/meminfo";

/// Cumulative CPU time counters from the aggregate `cpu` line of `/proc/stat`.
///
/// Values are in clock ticks since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuTimes {
    /// Time in user mode.
    pub user: u64,
    /// Time in user mode with low priority.
    pub nice: u64,
    /// Time in kernel mode.
    pub system: u64,
    /// Time idle.
    pub idle: u64,
    /// Time waiting for I/O.
    pub iowait: u64,
    /// Time servicing interrupts.
    pub irq: u64,
    /// Time servicing softirqs.
    pub softirq: u64,
}

impl CpuTimes {
    /// Sum of all tracked counters.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.user
            .saturating_add(self.nice)
            .saturating_add(self.system)
            .saturating_add(self.idle)
            .saturating_add(self.iowait)
            .saturating_add(self.irq)
            .saturating_add(self.softirq)
    }

    /// Time not spent doing work. I/O wait counts as idle.
    #[must_use]
    pub const fn idle(&self) -> u64 {
        self.idle.saturating_add(self.iowait)
    }
}

/// Parse the aggregate `cpu` line of `/proc/stat`.
///
/// Kernels older than 2.6 omit `iowait`, `irq` and `softirq`; those read as zero.
///
/// # Errors
///
/// Returns [`AgentError::Parse`] if there is no `cpu` line, it has fewer than
/// four counters, or a counter is not an integer.
pub fn parse_cpu_times(stat: &str) -> Result<CpuTimes> {
    let line = stat
        .lines()
        .find(|line| line.split_whitespace().next() == Some("cpu"))
        .ok_or_else(|| AgentError::parse(STAT, "aggregate cpu line not found"))?;

    let counters = line
        .split_whitespace()
        .skip(1)
        .take(7)
        .map(|field| {
            field
                .parse::<u64>()
                .map_err(|e| AgentError::parse(STAT, format!("bad counter {field:?}: {e}")))
        })
        .collect::<Result<Vec<u64>>>()?;

    if counters.len() < 4 {
        return Err(AgentError::parse(
            STAT,
            format!("expected at least 4 cpu counters, found {}", counters.len()),
        ));
    }

    let counter = |i: usize| counters.get(i).copied().unwrap_or(0);
    Ok(CpuTimes {
        user: counter(0),
        nice: counter(1),
        system: counter(2),
        idle: counter(3),
        iowait: counter(4),
        irq: counter(5),
        softirq: counter(6),
    })
}

/// Parse `/proc/meminfo` into a used-memory percentage.
///
/// Used memory is `MemTotal - MemAvailable`.
///
/// # Errors
///
/// Returns [`AgentError::Parse`] if `MemTotal` or `MemAvailable` is missing
/// or malformed.
pub fn parse_memory_usage(meminfo: &str) -> Result<f64> {
    let mut total = None;
    let mut available = None;

    for line in meminfo.lines() {
        if let Some(value) = line.strip_prefix("MemTotal:") {
            total = Some(parse_kb_value(value)?);
        } else if let Some(value) = line.strip_prefix("MemAvailable:") {
            available = Some(parse_kb_value(value)?);
        }
    }

    let total = total.ok_or_else(|| AgentError::parse(MEMINFO, "MemTotal not found"))?;
    let available =
        available.ok_or_else(|| AgentError::parse(MEMINFO, "MemAvailable not found"))?;

    Ok(usage_percent(total, available))
}

fn parse_kb_value(value: &str) -> Result<u64> {
    let number = value.trim().trim_end_matches("kB").trim();
    number
        .parse()
        .map_err(|e| AgentError::parse(MEMINFO, format!("bad value {number:?}: {e}")))
}

/// Total bytes read since boot by `sd*` and `nvme*` devices in `/proc/diskstats`.
///
/// Lines that do not parse are skipped. Partitions are counted alongside
/// their parent device.
#[must_use]
pub fn parse_disk_read_bytes(diskstats: &str) -> i64 {
    diskstats
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            // major, minor, device
            let device = fields.nth(2)?;
            // reads completed, reads merged, sectors read
            let sectors: i64 = fields.nth(2)?.parse().ok()?;
            (device.starts_with("sd") || device.starts_with("nvme"))
                .then_some(sectors.saturating_mul(SECTOR_SIZE))
        })
        .fold(0, i64::saturating_add)
}

/// `(total - available) / total` as a percentage, or `0.0` for an empty total.
#[must_use]
pub fn usage_percent(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    total.saturating_sub(available) as f64 / total as f64 * 100.0
}
