use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Thread-safe counters for the trailing stop monitor and its feed.
#[derive(Debug)]
pub struct TrailingMetrics {
    // Feed
    ticks_received: AtomicU64,
    parse_errors: AtomicU64,
    websocket_errors: AtomicU64,
    reconnect_attempts: AtomicU64,

    // Dispatch
    ticks_dispatched: AtomicU64,
    ticks_dropped: AtomicU64,

    // Order processing
    status_checks: AtomicU64,
    reorders_attempted: AtomicU64,
    reorders_completed: AtomicU64,
    cancel_failures: AtomicU64,
    create_failures: AtomicU64,
    orders_registered: AtomicU64,
    orders_deregistered: AtomicU64,

    inner: RwLock<MetricsInner>,
}

#[derive(Debug)]
struct MetricsInner {
    start_time: Instant,
    last_tick_time: Option<Instant>,
    last_reorder_time: Option<Instant>,
}

impl Default for TrailingMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TrailingMetrics {
    pub fn new() -> Self {
        Self {
            ticks_received: AtomicU64::new(0),
            parse_errors: AtomicU64::new(0),
            websocket_errors: AtomicU64::new(0),
            reconnect_attempts: AtomicU64::new(0),
            ticks_dispatched: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
            status_checks: AtomicU64::new(0),
            reorders_attempted: AtomicU64::new(0),
            reorders_completed: AtomicU64::new(0),
            cancel_failures: AtomicU64::new(0),
            create_failures: AtomicU64::new(0),
            orders_registered: AtomicU64::new(0),
            orders_deregistered: AtomicU64::new(0),
            inner: RwLock::new(MetricsInner {
                start_time: Instant::now(),
                last_tick_time: None,
                last_reorder_time: None,
            }),
        }
    }

    // --- Feed ---

    pub fn inc_ticks_received(&self) {
        self.ticks_received.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_tick_time = Some(Instant::now());
    }

    pub fn inc_parse_errors(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_websocket_errors(&self) {
        self.websocket_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    // --- Dispatch ---

    pub fn inc_ticks_dispatched(&self) {
        self.ticks_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_ticks_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    // --- Order processing ---

    pub fn inc_status_checks(&self) {
        self.status_checks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reorders_attempted(&self) {
        self.reorders_attempted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_reorders_completed(&self) {
        self.reorders_completed.fetch_add(1, Ordering::Relaxed);
        self.inner.write().last_reorder_time = Some(Instant::now());
    }

    pub fn inc_cancel_failures(&self) {
        self.cancel_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// A create failed after its cancel succeeded: the position is unprotected.
    pub fn inc_create_failures(&self) {
        self.create_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_registered(&self) {
        self.orders_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_orders_deregistered(&self) {
        self.orders_deregistered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.read();
        let uptime_secs = inner.start_time.elapsed().as_secs_f64();
        let ticks_received = self.ticks_received.load(Ordering::Relaxed);

        MetricsSnapshot {
            uptime_secs,
            ticks_received,
            ticks_per_second: if uptime_secs > 0.0 {
                ticks_received as f64 / uptime_secs
            } else {
                0.0
            },
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            websocket_errors: self.websocket_errors.load(Ordering::Relaxed),
            reconnect_attempts: self.reconnect_attempts.load(Ordering::Relaxed),
            ticks_dispatched: self.ticks_dispatched.load(Ordering::Relaxed),
            ticks_dropped: self.ticks_dropped.load(Ordering::Relaxed),
            status_checks: self.status_checks.load(Ordering::Relaxed),
            reorders_attempted: self.reorders_attempted.load(Ordering::Relaxed),
            reorders_completed: self.reorders_completed.load(Ordering::Relaxed),
            cancel_failures: self.cancel_failures.load(Ordering::Relaxed),
            create_failures: self.create_failures.load(Ordering::Relaxed),
            orders_registered: self.orders_registered.load(Ordering::Relaxed),
            orders_deregistered: self.orders_deregistered.load(Ordering::Relaxed),
            secs_since_last_tick: inner.last_tick_time.map(|t| t.elapsed().as_secs_f64()),
            secs_since_last_reorder: inner.last_reorder_time.map(|t| t.elapsed().as_secs_f64()),
        }
    }
}

/// Point-in-time copy of all counters.
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub uptime_secs: f64,
    pub ticks_received: u64,
    pub ticks_per_second: f64,
    pub parse_errors: u64,
    pub websocket_errors: u64,
    pub reconnect_attempts: u64,
    pub ticks_dispatched: u64,
    pub ticks_dropped: u64,
    pub status_checks: u64,
    pub reorders_attempted: u64,
    pub reorders_completed: u64,
    pub cancel_failures: u64,
    pub create_failures: u64,
    pub orders_registered: u64,
    pub orders_deregistered: u64,
    pub secs_since_last_tick: Option<f64>,
    pub secs_since_last_reorder: Option<f64>,
}

/// Overall health derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    /// Feed errors or dropped ticks, but every position is protected.
    Degraded,
    /// At least one replacement left a position without a stop.
    Unprotected,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Unprotected => write!(f, "UNPROTECTED"),
        }
    }
}

impl MetricsSnapshot {
    pub fn health_status(&self) -> HealthStatus {
        if self.create_failures > 0 {
            HealthStatus::Unprotected
        } else if self.websocket_errors > 0 || self.parse_errors > 0 || self.ticks_dropped > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Trailing Stop Metrics ===")?;
        writeln!(f, "Status:            {}", self.health_status())?;
        writeln!(f, "Uptime:            {:.1}s", self.uptime_secs)?;
        writeln!(
            f,
            "Ticks:             {} received ({:.1}/s), {} dispatched, {} dropped",
            self.ticks_received, self.ticks_per_second, self.ticks_dispatched, self.ticks_dropped
        )?;
        writeln!(
            f,
            "Feed errors:       {} websocket, {} parse, {} reconnects",
            self.websocket_errors, self.parse_errors, self.reconnect_attempts
        )?;
        writeln!(
            f,
            "Orders:            {} registered, {} deregistered, {} status checks",
            self.orders_registered, self.orders_deregistered, self.status_checks
        )?;
        writeln!(
            f,
            "Reorders:          {} attempted, {} completed",
            self.reorders_attempted, self.reorders_completed
        )?;
        write!(
            f,
            "Failures:          {} cancel, {} create (unprotected)",
            self.cancel_failures, self.create_failures
        )
    }
}

pub type SharedMetrics = Arc<TrailingMetrics>;

pub fn create_metrics() -> SharedMetrics {
    Arc::new(TrailingMetrics::new())
}
