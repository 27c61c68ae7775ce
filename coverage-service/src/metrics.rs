use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use utoipa::ToSchema;

/// A copy of the service counters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, ToSchema)]
pub struct ServiceMetricsSnapshot {
    /// Reconciliations that produced a result
    pub reconciliations: u64,
    /// Reconciliations aborted because the store or oracle failed
    pub failed_reconciliations: u64,
    /// Worker tasks started
    pub tasks_dispatched: u64,
    /// Worker tasks the launcher refused or could not start
    pub tasks_failed: u64,
}

impl Display for ServiceMetricsSnapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Coverage Service Metrics Snapshot:")?;
        writeln!(f, "  Reconciliations: {}", self.reconciliations)?;
        writeln!(
            f,
            "  Failed reconciliations: {}",
            self.failed_reconciliations
        )?;
        writeln!(f, "  Tasks dispatched: {}", self.tasks_dispatched)?;
        writeln!(f, "  Tasks failed: {}", self.tasks_failed)
    }
}

#[derive(Debug, Default)]
pub struct ServiceMetrics {
    reconciliations: AtomicU64,
    failed_reconciliations: AtomicU64,
    tasks_dispatched: AtomicU64,
    tasks_failed: AtomicU64,
}

impl ServiceMetrics {
    pub fn snapshot(&self) -> ServiceMetricsSnapshot {
        ServiceMetricsSnapshot {
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
            failed_reconciliations: self.failed_reconciliations.load(Ordering::Relaxed),
            tasks_dispatched: self.tasks_dispatched.load(Ordering::Relaxed),
            tasks_failed: self.tasks_failed.load(Ordering::Relaxed),
        }
    }

    pub fn increment_reconciliations(&self) {
        self.reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_reconciliations(&self) {
        self.failed_reconciliations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_dispatched(&self, started: u64, failed: u64) {
        self.tasks_dispatched.fetch_add(started, Ordering::Relaxed);
        self.tasks_failed.fetch_add(failed, Ordering::Relaxed);
    }
}

/// Shared metrics instance
pub type SharedMetrics = Arc<ServiceMetrics>;

pub fn create_shared_metrics() -> SharedMetrics {
    Arc::new(ServiceMetrics::default())
}
