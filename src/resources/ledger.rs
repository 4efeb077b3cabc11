//! Teardown bookkeeping.
//!
//! Every release performed during teardown appends one record, in the order
//! the releases happened. The ledger is shared, so callers can keep a handle
//! before the resource set is moved into the serve loop.

use std::sync::{Arc, Mutex};

use crate::resources::BackendKind;

/// Result of releasing a single resource handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Released,
    Failed(String),
    /// Grace period elapsed; the release was abandoned.
    TimedOut,
}

impl ReleaseOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReleaseOutcome::Released => "released",
            ReleaseOutcome::Failed(_) => "failed",
            ReleaseOutcome::TimedOut => "timed_out",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRecord {
    pub backend: BackendKind,
    pub outcome: ReleaseOutcome,
}

/// Append-only log of releases.
#[derive(Debug, Clone, Default)]
pub struct ReleaseLedger {
    records: Arc<Mutex<Vec<ReleaseRecord>>>,
}

impl ReleaseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, backend: BackendKind, outcome: ReleaseOutcome) {
        self.lock().push(ReleaseRecord { backend, outcome });
    }

    /// Snapshot of all releases so far, in release order.
    pub fn records(&self) -> Vec<ReleaseRecord> {
        self.lock().clone()
    }

    /// Backends in the order they were released.
    pub fn release_order(&self) -> Vec<BackendKind> {
        self.lock().iter().map(|r| r.backend).collect()
    }

    /// How many times `backend` has been released.
    pub fn count(&self, backend: BackendKind) -> usize {
        self.lock().iter().filter(|r| r.backend == backend).count()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ReleaseRecord>> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_records() {
        let ledger = ReleaseLedger::new();
        let observer = ledger.clone();

        ledger.record(BackendKind::Queue, ReleaseOutcome::Released);
        ledger.record(BackendKind::Database, ReleaseOutcome::TimedOut);

        assert_eq!(
            observer.release_order(),
            vec![BackendKind::Queue, BackendKind::Database]
        );
        assert_eq!(observer.count(BackendKind::Database), 1);
        assert_eq!(observer.records()[1].outcome.as_str(), "timed_out");
    }
}
