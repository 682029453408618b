//! Runtime counters

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::info;

const MB: u64 = 1024 * 1024;

/// Process-wide relay counters
#[derive(Debug)]
pub struct Stats {
    started_at: Instant,
    active_relays: AtomicU64,
    total_relays: AtomicU64,
    bytes_sent: AtomicU64,
    bytes_received: AtomicU64,
    failed_dials: AtomicU64,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub uptime: Duration,
    pub active_relays: u64,
    pub total_relays: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub failed_dials: u64,
}

/// Marks one relay as active until dropped
pub struct RelayGuard<'a> {
    stats: &'a Stats,
}

impl Drop for RelayGuard<'_> {
    fn drop(&mut self) {
        self.stats.active_relays.fetch_sub(1, Ordering::Relaxed);
    }
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            active_relays: AtomicU64::new(0),
            total_relays: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            failed_dials: AtomicU64::new(0),
        }
    }

    /// Shared instance used by the relay, dialer and server
    pub fn global() -> &'static Stats {
        static GLOBAL: OnceLock<Stats> = OnceLock::new();
        GLOBAL.get_or_init(Stats::new)
    }

    pub fn relay_started(&self) -> RelayGuard<'_> {
        self.active_relays.fetch_add(1, Ordering::Relaxed);
        self.total_relays.fetch_add(1, Ordering::Relaxed);
        RelayGuard { stats: self }
    }

    pub fn add_sent(&self, n: usize) {
        self.bytes_sent.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_received(&self, n: usize) {
        self.bytes_received.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn record_dial_failure(&self) {
        self.failed_dials.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            active_relays: self.active_relays.load(Ordering::Relaxed),
            total_relays: self.total_relays.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            failed_dials: self.failed_dials.load(Ordering::Relaxed),
        }
    }

    /// Log a one-line summary
    pub fn log(&self) {
        let snap = self.snapshot();
        info!(
            "Stats: uptime={}s relays={}/{} sent={}MB recv={}MB failed_dials={}",
            snap.uptime.as_secs(),
            snap.active_relays,
            snap.total_relays,
            snap.bytes_sent / MB,
            snap.bytes_received / MB,
            snap.failed_dials
        );
    }
}

/// Log the global stats every `interval` (60s when zero)
pub fn spawn_stats_logger(interval: Duration) -> JoinHandle<()> {
    let period = if interval.is_zero() {
        Duration::from_secs(60)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            Stats::global().log();
        }
    })
}
