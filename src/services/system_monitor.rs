use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// Point-in-time host utilization shown on the admin console.
#[derive(Debug, Clone, PartialEq)]
pub struct HostMetrics {
    pub cpu_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_percent: f32,
    pub sampled_at: DateTime<Utc>,
}

/// Keeps one `sysinfo::System` around so CPU usage has a baseline between samples.
pub struct SystemMonitor {
    sys: System,
    sample_window: Duration,
}

impl SystemMonitor {
    pub fn new(sample_window: Duration) -> Self {
        let mut sys = System::new_with_specifics(
            RefreshKind::new()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        Self {
            sys,
            sample_window: sample_window.max(MINIMUM_CPU_UPDATE_INTERVAL),
        }
    }

    /// Reads whatever the last refresh recorded, without waiting.
    pub fn current(&self) -> HostMetrics {
        let memory_total = self.sys.total_memory();
        let memory_used = self.sys.used_memory();

        HostMetrics {
            cpu_percent: self.sys.global_cpu_usage(),
            memory_used_mb: memory_used / 1024 / 1024,
            memory_total_mb: memory_total / 1024 / 1024,
            memory_percent: memory_percent(memory_used, memory_total),
            sampled_at: Utc::now(),
        }
    }

    /// Measures CPU load across the sample window, then reads memory.
    pub async fn sample(&mut self) -> HostMetrics {
        self.sys.refresh_cpu_usage();
        tokio::time::sleep(self.sample_window).await;
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.current()
    }
}

/// Samples forever, publishing each result into `latest`. Each round takes one
/// sample window, which also paces the loop.
pub fn spawn_sampler(mut monitor: SystemMonitor, latest: Arc<RwLock<HostMetrics>>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!("Host metrics sampler started");
        loop {
            let metrics = monitor.sample().await;
            tracing::trace!("Host metrics: {:?}", metrics);
            *latest.write().await = metrics;
        }
    })
}

fn memory_percent(used: u64, total: u64) -> f32 {
    if total == 0 {
        0.0
    } else {
        ((used as f64 / total as f64) * 100.0) as f32
    }
}
