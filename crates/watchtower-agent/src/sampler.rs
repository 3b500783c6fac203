//! Turning raw host counters into [`Metric`] samples.

use std::fs;
use std::path::{Path, PathBuf};

use sysinfo::Disks;
use tracing::debug;
use watchtower_store::{Metric, now_nanos};

use crate::error::{AgentError, Result};
use crate::procfs::{self, CpuTimes};

/// Source of host counters.
///
/// [`ProcfsProbe`] reads the live system; tests substitute scripted probes.
pub trait HostProbe {
    /// Current cumulative CPU counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be read.
    fn cpu_times(&mut self) -> Result<CpuTimes>;

    /// Used memory as a percentage.
    ///
    /// # Errors
    ///
    /// Returns an error if memory counters cannot be read.
    fn memory_usage(&mut self) -> Result<f64>;

    /// Used space of the monitored filesystem as a percentage.
    fn disk_usage(&mut self) -> f64;

    /// Cumulative bytes read from block devices since boot.
    ///
    /// # Errors
    ///
    /// Returns an error if the disk counters cannot be read.
    fn disk_read_bytes(&mut self) -> Result<i64>;
}

/// Probe backed by `/proc` and the mounted filesystem table.
#[derive(Debug, Clone)]
pub struct ProcfsProbe {
    proc_root: PathBuf,
    mount_point: PathBuf,
}

impl Default for ProcfsProbe {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcfsProbe {
    /// Probe the live system, reporting disk usage for `/`.
    #[must_use]
    pub fn new() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
            mount_point: PathBuf::from("/"),
        }
    }

    /// Read counter files from `root` instead of `/proc`.
    #[must_use]
    pub fn with_proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Report disk usage for the filesystem mounted at `mount_point`.
    #[must_use]
    pub fn with_mount_point(mut self, mount_point: impl Into<PathBuf>) -> Self {
        self.mount_point = mount_point.into();
        self
    }

    fn read(&self, name: &str) -> Result<String> {
        let path = self.proc_root.join(name);
        fs::read_to_string(&path).map_err(|source| AgentError::Read { path, source })
    }
}

impl HostProbe for ProcfsProbe {
    fn cpu_times(&mut self) -> Result<CpuTimes> {
        procfs::parse_cpu_times(&self.read("stat")?)
    }

    fn memory_usage(&mut self) -> Result<f64> {
        procfs::parse_memory_usage(&self.read("meminfo")?)
    }

    fn disk_usage(&mut self) -> f64 {
        mounted_usage(&self.mount_point)
    }

    fn disk_read_bytes(&mut self) -> Result<i64> {
        Ok(procfs::parse_disk_read_bytes(&self.read("diskstats")?))
    }
}

/// Used space of the filesystem mounted exactly at `mount_point`, or `0.0`
/// when nothing is mounted there.
fn mounted_usage(mount_point: &Path) -> f64 {
    let disks = Disks::new_with_refreshed_list();
    disks
        .iter()
        .find(|disk| disk.mount_point() == mount_point)
        .map_or(0.0, |disk| {
            procfs::usage_percent(disk.total_space(), disk.available_space())
        })
}

/// Converts successive cumulative CPU counters into a busy percentage.
#[derive(Debug, Clone, Copy)]
pub struct CpuTracker {
    previous: CpuTimes,
}

impl CpuTracker {
    /// Start tracking from an initial reading.
    #[must_use]
    pub const fn new(initial: CpuTimes) -> Self {
        Self { previous: initial }
    }

    /// Busy percentage since the previous reading; `current` becomes the new
    /// baseline.
    ///
    /// Returns `0.0` when no ticks elapsed. Counters that went backwards are
    /// treated as no progress.
    pub fn update(&mut self, current: CpuTimes) -> f64 {
        let total = current.total().saturating_sub(self.previous.total());
        let idle = current.idle().saturating_sub(self.previous.idle());
        self.previous = current;

        if total == 0 {
            return 0.0;
        }
        total.saturating_sub(idle) as f64 / total as f64 * 100.0
    }
}

/// Produces one [`Metric`] per call from a [`HostProbe`].
#[derive(Debug)]
pub struct Sampler<P> {
    hostname: String,
    probe: P,
    cpu: CpuTracker,
}

impl<P: HostProbe> Sampler<P> {
    /// Create a sampler, taking the CPU baseline from `probe`.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial CPU counters cannot be read.
    pub fn new(hostname: impl Into<String>, mut probe: P) -> Result<Self> {
        let baseline = probe.cpu_times()?;
        Ok(Self {
            hostname: hostname.into(),
            probe,
            cpu: CpuTracker::new(baseline),
        })
    }

    /// Hostname stamped on every sample.
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Take one sample.
    ///
    /// CPU usage covers the time since the previous call (or since
    /// construction). Disk I/O is the raw cumulative counter.
    ///
    /// # Errors
    ///
    /// Returns an error if any counter cannot be read.
    pub fn sample(&mut self) -> Result<Metric> {
        let cpu_usage = self.cpu.update(self.probe.cpu_times()?);
        let memory_usage = self.probe.memory_usage()?;
        let disk_usage = self.probe.disk_usage();
        let disk_io_read = self.probe.disk_read_bytes()?;

        debug!(
            host = %self.hostname,
            cpu = cpu_usage,
            memory = memory_usage,
            disk = disk_usage,
            disk_io_read,
            "sampled host"
        );

        Ok(Metric::new(self.hostname.clone(), now_nanos())
            .with_cpu(cpu_usage)
            .with_memory(memory_usage)
            .with_disk(disk_usage)
            .with_disk_io_read(disk_io_read))
    }
}
