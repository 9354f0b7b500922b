//! `sysinfo`-backed implementation of the `StatsService` trait.

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sysinfo::{Disks, Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::db::Store;
use crate::services::stats_service::{
    CapacityGb, CountBreakdown, HostSummary, ServerStats, StatsError, StatsService, SystemStats,
    format_uptime,
};

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

#[derive(Debug, Clone, Copy, Default)]
struct HostSnapshot {
    cpu_count: usize,
    cpu_percent: f32,
    cpu_freq_mhz: Option<u64>,
    memory_total: u64,
    memory_used: u64,
    memory_available: u64,
    disk_total: u64,
    disk_free: u64,
    process_rss: u64,
    process_vms: u64,
}

impl HostSnapshot {
    const fn disk_used(&self) -> u64 {
        self.disk_total.saturating_sub(self.disk_free)
    }
}

pub struct SysinfoStatsService {
    store: Store,
    // Cached between calls: CPU usage is the delta since the previous refresh.
    system: Arc<Mutex<System>>,
    started: Instant,
    started_at: DateTime<Utc>,
}

impl SysinfoStatsService {
    #[must_use]
    pub fn new(store: Store) -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();

        Self {
            store,
            system: Arc::new(Mutex::new(system)),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    async fn snapshot(&self) -> Result<HostSnapshot, StatsError> {
        let system = self.system.clone();
        tokio::task::spawn_blocking(move || collect(&system))
            .await
            .map_err(|e| StatsError::Internal(e.to_string()))?
    }
}

fn collect(system: &Mutex<System>) -> Result<HostSnapshot, StatsError> {
    let mut sys = system
        .lock()
        .map_err(|_| StatsError::Internal("System info lock poisoned".to_string()))?;

    sys.refresh_cpu_all();
    sys.refresh_memory();

    let pid = Pid::from_u32(std::process::id());
    sys.refresh_processes_specifics(
        ProcessesToUpdate::Some(&[pid]),
        ProcessRefreshKind::new().with_memory(),
    );

    let (process_rss, process_vms) = sys
        .process(pid)
        .map_or((0, 0), |p| (p.memory(), p.virtual_memory()));

    let (disk_total, disk_free) = root_disk_usage();

    Ok(HostSnapshot {
        cpu_count: sys.cpus().len(),
        cpu_percent: sys.global_cpu_usage(),
        cpu_freq_mhz: sys.cpus().first().map(sysinfo::Cpu::frequency),
        memory_total: sys.total_memory(),
        memory_used: sys.used_memory(),
        memory_available: sys.available_memory(),
        disk_total,
        disk_free,
        process_rss,
        process_vms,
    })
}

/// Usage of the filesystem mounted at `/`, or the largest disk when there is none.
fn root_disk_usage() -> (u64, u64) {
    let disks = Disks::new_with_refreshed_list();

    disks
        .list()
        .iter()
        .find(|d| d.mount_point() == Path::new("/"))
        .or_else(|| disks.list().iter().max_by_key(|d| d.total_space()))
        .map_or((0, 0), |d| (d.total_space(), d.available_space()))
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[allow(clippy::cast_precision_loss)]
fn gib(bytes: u64) -> f64 {
    round2(bytes as f64 / GIB)
}

#[async_trait]
impl StatsService for SysinfoStatsService {
    async fn server_stats(&self) -> Result<ServerStats, StatsError> {
        let host = self.snapshot().await?;

        Ok(ServerStats {
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            platform: System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
            platform_version: System::os_version().unwrap_or_default(),
            architecture: std::env::consts::ARCH.to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),

            cpu_count: host.cpu_count,
            cpu_percent: host.cpu_percent,
            cpu_freq_current: host.cpu_freq_mhz,

            memory_total: host.memory_total,
            memory_used: host.memory_used,
            memory_available: host.memory_available,
            memory_percent: percent(host.memory_used, host.memory_total),

            disk_total: host.disk_total,
            disk_used: host.disk_used(),
            disk_free: host.disk_free,
            disk_percent: percent(host.disk_used(), host.disk_total),

            app_uptime_seconds: self.started.elapsed().as_secs(),
            app_start_time: self.started_at.to_rfc3339(),
            current_time: Utc::now().to_rfc3339(),

            process_id: std::process::id(),
            process_memory_rss: host.process_rss,
            process_memory_vms: host.process_vms,
        })
    }

    async fn system_stats(&self) -> Result<SystemStats, StatsError> {
        let users = self.store.user_counts().await?;
        let (subscribers_total, subscribers_active) = self.store.subscription_counts().await?;
        let host = self.snapshot().await?;

        Ok(SystemStats {
            users: CountBreakdown::new(users.total, users.active),
            subscribers: CountBreakdown::new(subscribers_total, subscribers_active),
            server: HostSummary {
                cpu_usage_percent: round2(f64::from(host.cpu_percent)),
                memory: CapacityGb {
                    total_gb: gib(host.memory_total),
                    used_gb: gib(host.memory_used),
                    available_gb: gib(host.memory_available),
                    percent: percent(host.memory_used, host.memory_total),
                },
                disk: CapacityGb {
                    total_gb: gib(host.disk_total),
                    used_gb: gib(host.disk_used()),
                    available_gb: gib(host.disk_free),
                    percent: percent(host.disk_used(), host.disk_total),
                },
                uptime: format_uptime(System::uptime()),
                timestamp: Utc::now().to_rfc3339(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_and_rounding() {
        assert!((percent(1, 3) - 33.33).abs() < f64::EPSILON);
        assert!((percent(5, 0)).abs() < f64::EPSILON);
        assert!((gib(3 * 1024 * 1024 * 1024) - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_collect_reports_this_process() {
        let system = Mutex::new(System::new());
        let snapshot = collect(&system).unwrap();

        assert!(snapshot.cpu_count > 0);
        assert!(snapshot.memory_total >= snapshot.memory_available);
        assert!(snapshot.disk_total >= snapshot.disk_free);
    }
}
