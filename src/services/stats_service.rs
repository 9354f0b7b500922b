//! Domain service for host and application statistics.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for StatsError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for StatsError {
    fn from(err: anyhow::Error) -> Self {
        Self::Database(err.to_string())
    }
}

/// Raw host and process figures. Sizes are bytes.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStats {
    pub hostname: String,
    pub platform: String,
    pub platform_version: String,
    pub architecture: String,
    pub app_version: String,

    pub cpu_count: usize,
    pub cpu_percent: f32,
    pub cpu_freq_current: Option<u64>,

    pub memory_total: u64,
    pub memory_used: u64,
    pub memory_available: u64,
    pub memory_percent: f64,

    pub disk_total: u64,
    pub disk_used: u64,
    pub disk_free: u64,
    pub disk_percent: f64,

    pub app_uptime_seconds: u64,
    pub app_start_time: String,
    pub current_time: String,

    pub process_id: u32,
    pub process_memory_rss: u64,
    pub process_memory_vms: u64,
}

/// [`ServerStats`] plus human-readable renderings.
#[derive(Debug, Clone, Serialize)]
pub struct ServerStatsFormatted {
    #[serde(flatten)]
    pub stats: ServerStats,
    pub memory_total_formatted: String,
    pub memory_used_formatted: String,
    pub memory_available_formatted: String,
    pub disk_total_formatted: String,
    pub disk_used_formatted: String,
    pub disk_free_formatted: String,
    pub uptime_formatted: String,
    pub process_memory_rss_formatted: String,
    pub process_memory_vms_formatted: String,
}

impl From<ServerStats> for ServerStatsFormatted {
    fn from(stats: ServerStats) -> Self {
        Self {
            memory_total_formatted: format_bytes(stats.memory_total),
            memory_used_formatted: format_bytes(stats.memory_used),
            memory_available_formatted: format_bytes(stats.memory_available),
            disk_total_formatted: format_bytes(stats.disk_total),
            disk_used_formatted: format_bytes(stats.disk_used),
            disk_free_formatted: format_bytes(stats.disk_free),
            uptime_formatted: format_uptime(stats.app_uptime_seconds),
            process_memory_rss_formatted: format_bytes(stats.process_memory_rss),
            process_memory_vms_formatted: format_bytes(stats.process_memory_vms),
            stats,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CountBreakdown {
    pub total: u64,
    pub active: u64,
    pub inactive: u64,
}

impl CountBreakdown {
    #[must_use]
    pub const fn new(total: u64, active: u64) -> Self {
        Self {
            total,
            active,
            inactive: total.saturating_sub(active),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CapacityGb {
    pub total_gb: f64,
    pub used_gb: f64,
    pub available_gb: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HostSummary {
    pub cpu_usage_percent: f64,
    pub memory: CapacityGb,
    pub disk: CapacityGb,
    pub uptime: String,
    pub timestamp: String,
}

/// Admin overview: row counts plus a host summary.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStats {
    pub users: CountBreakdown,
    pub subscribers: CountBreakdown,
    pub server: HostSummary,
}

#[async_trait::async_trait]
pub trait StatsService: Send + Sync {
    async fn server_stats(&self) -> Result<ServerStats, StatsError>;

    async fn system_stats(&self) -> Result<SystemStats, StatsError>;
}

/// Renders a byte count with binary units, e.g. `1.50 KB`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

    let mut value = bytes as f64;
    for unit in UNITS {
        if value < 1024.0 {
            return format!("{value:.2} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.2} PB")
}

/// Renders seconds as `1d 2h 3m 4s`, omitting zero components.
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::with_capacity(4);
    if days > 0 {
        parts.push(format!("{days}d"));
    }
    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0.00 B");
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(1024 * 1024), "1.00 MB");
        assert_eq!(format_bytes(5 * 1024 * 1024 * 1024), "5.00 GB");
        assert_eq!(format_bytes(1024_u64.pow(5)), "1.00 PB");
    }

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0s");
        assert_eq!(format_uptime(59), "59s");
        assert_eq!(format_uptime(60), "1m");
        assert_eq!(format_uptime(3_661), "1h 1m 1s");
        assert_eq!(format_uptime(86_400 + 7_200), "1d 2h");
    }

    #[test]
    fn test_count_breakdown() {
        let counts = CountBreakdown::new(10, 7);
        assert_eq!(counts.inactive, 3);
        assert_eq!(CountBreakdown::new(1, 2).inactive, 0);
    }
}
