//! # Session Context
//!
//! Per-run state shared by every worker through an `Arc`: the byte budget,
//! the folder progress counter, the failure list, outcome tallies and the
//! cancellation token. Each piece sits behind its own lock.

use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::report::SyncReport;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Default)]
struct BudgetState {
    committed: u64,
    reserved: u64,
}

/// Session-wide byte ceiling.
///
/// Admission and commit happen under the same mutex, so concurrent
/// downloads can never push `committed` past the limit.
#[derive(Debug)]
pub struct ByteBudget {
    limit: Option<u64>,
    state: Mutex<BudgetState>,
}

impl ByteBudget {
    /// `None` tracks bytes without enforcing a ceiling.
    pub fn new(limit: Option<u64>) -> Arc<Self> {
        Arc::new(Self {
            limit,
            state: Mutex::new(BudgetState::default()),
        })
    }

    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn committed(&self) -> u64 {
        lock(&self.state).committed
    }

    pub fn reserved(&self) -> u64 {
        lock(&self.state).reserved
    }

    /// Cheap check: would `bytes` more overflow the ceiling right now?
    pub fn would_exceed(&self, bytes: u64) -> bool {
        let Some(limit) = self.limit else {
            return false;
        };
        let state = lock(&self.state);
        let used = state.committed + state.reserved;
        used >= limit || used.saturating_add(bytes) > limit
    }

    /// Reserve `bytes` for an in-flight download, or `None` if that would
    /// overflow the ceiling.
    pub fn try_reserve(self: &Arc<Self>, bytes: u64) -> Option<BudgetReservation> {
        let mut state = lock(&self.state);
        if let Some(limit) = self.limit {
            let used = state.committed + state.reserved;
            if used >= limit || used.saturating_add(bytes) > limit {
                return None;
            }
        }
        state.reserved += bytes;
        Some(BudgetReservation {
            budget: Arc::clone(self),
            bytes,
            settled: false,
        })
    }
}

/// Bytes held for one admitted file.
///
/// [`commit`](Self::commit) moves them to the committed total; dropping the
/// reservation without committing releases them.
#[derive(Debug)]
pub struct BudgetReservation {
    budget: Arc<ByteBudget>,
    bytes: u64,
    settled: bool,
}

impl BudgetReservation {
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn commit(mut self, actual: u64) {
        let mut state = lock(&self.budget.state);
        state.reserved = state.reserved.saturating_sub(self.bytes);
        state.committed += actual;
        self.settled = true;
    }
}

impl Drop for BudgetReservation {
    fn drop(&mut self) {
        if !self.settled {
            let mut state = lock(&self.budget.state);
            state.reserved = state.reserved.saturating_sub(self.bytes);
        }
    }
}

/// Folders enumerated so far, shared by walker tasks.
#[derive(Debug, Default)]
pub struct FolderProgress {
    processed: Mutex<u64>,
}

impl FolderProgress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Count one folder; logs every 10th.
    pub fn tick(&self, files_found: u64) -> u64 {
        let mut processed = lock(&self.processed);
        *processed += 1;
        if *processed % 10 == 0 {
            info!(folders = *processed, files_found, "Scanning remote tree");
        }
        *processed
    }

    pub fn processed(&self) -> u64 {
        *lock(&self.processed)
    }
}

/// Shared state of one run.
pub struct SessionContext {
    pub budget: Arc<ByteBudget>,
    pub progress: Arc<FolderProgress>,
    pub cancel: CancellationToken,
    failures: Mutex<Vec<String>>,
    report: Mutex<SyncReport>,
}

impl SessionContext {
    pub fn new(budget_limit: Option<u64>, cancel: CancellationToken) -> Arc<Self> {
        Arc::new(Self {
            budget: ByteBudget::new(budget_limit),
            progress: FolderProgress::new(),
            cancel,
            failures: Mutex::new(Vec::new()),
            report: Mutex::new(SyncReport::default()),
        })
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn add_failure(&self, path: impl Into<String>) {
        lock(&self.failures).push(path.into());
    }

    /// Failed paths, sorted.
    pub fn failures(&self) -> Vec<String> {
        let mut failures = lock(&self.failures).clone();
        failures.sort();
        failures
    }

    pub fn tally(&self, update: impl FnOnce(&mut SyncReport)) {
        update(&mut lock(&self.report));
    }

    pub fn report(&self) -> SyncReport {
        lock(&self.report).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservation_commit_and_release() {
        let budget = ByteBudget::new(Some(100));

        let first = budget.try_reserve(60).unwrap();
        assert_eq!(budget.reserved(), 60);
        assert!(budget.try_reserve(50).is_none());

        let second = budget.try_reserve(40).unwrap();
        assert!(budget.try_reserve(1).is_none());

        first.commit(60);
        drop(second);
        assert_eq!(budget.committed(), 60);
        assert_eq!(budget.reserved(), 0);
        assert!(budget.would_exceed(41));
        assert!(!budget.would_exceed(40));
    }

    #[test]
    fn test_exhausted_budget_rejects_empty_files() {
        let budget = ByteBudget::new(Some(10));
        budget.try_reserve(10).unwrap().commit(10);
        assert!(budget.try_reserve(0).is_none());
    }

    #[test]
    fn test_unlimited_budget_tracks_bytes() {
        let budget = ByteBudget::new(None);
        budget.try_reserve(u64::MAX / 2).unwrap().commit(5);
        assert_eq!(budget.committed(), 5);
        assert!(!budget.would_exceed(u64::MAX));
    }

    #[test]
    fn test_concurrent_reservations_respect_limit() {
        let budget = ByteBudget::new(Some(1000));
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let budget = Arc::clone(&budget);
                std::thread::spawn(move || {
                    let mut admitted = 0;
                    for _ in 0..20 {
                        if let Some(reservation) = budget.try_reserve(7) {
                            reservation.commit(7);
                            admitted += 1;
                        }
                    }
                    admitted
                })
            })
            .collect();

        let admitted: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(budget.committed(), admitted * 7);
        assert!(budget.committed() <= 1000);
    }

    #[test]
    fn test_failures_are_sorted() {
        let session = SessionContext::new(None, CancellationToken::new());
        session.add_failure("b.txt");
        session.add_failure("a.txt");
        assert_eq!(session.failures(), vec!["a.txt", "b.txt"]);

        session.tally(|r| r.converted += 2);
        assert_eq!(session.report().converted, 2);
    }
}
