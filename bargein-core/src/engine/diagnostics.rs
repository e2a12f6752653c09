//! Lock-free engine counters.

use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Serialize;

use crate::decision::DecisionKind;

#[derive(Default)]
pub struct EngineDiagnostics {
    pub partials_in: AtomicUsize,
    pub finals_in: AtomicUsize,
    pub partials_deferred: AtomicUsize,
    pub timeouts_fired: AtomicUsize,
    pub timeouts_dropped: AtomicUsize,
    pub stale_timer_fires: AtomicUsize,
    pub ignored: AtomicUsize,
    pub interrupted: AtomicUsize,
    pub passed: AtomicUsize,
}

impl EngineDiagnostics {
    pub(crate) fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decision(&self, kind: DecisionKind) {
        let counter = match kind {
            DecisionKind::Ignore => &self.ignored,
            DecisionKind::Interrupt => &self.interrupted,
            DecisionKind::Pass => &self.passed,
        };
        Self::bump(counter);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            partials_in: self.partials_in.load(Ordering::Relaxed),
            finals_in: self.finals_in.load(Ordering::Relaxed),
            partials_deferred: self.partials_deferred.load(Ordering::Relaxed),
            timeouts_fired: self.timeouts_fired.load(Ordering::Relaxed),
            timeouts_dropped: self.timeouts_dropped.load(Ordering::Relaxed),
            stale_timer_fires: self.stale_timer_fires.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            passed: self.passed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub partials_in: usize,
    pub finals_in: usize,
    pub partials_deferred: usize,
    /// Timer expiries that reached a pending partial (decided or dropped).
    pub timeouts_fired: usize,
    /// Expired partials that matched neither list.
    pub timeouts_dropped: usize,
    /// Timer tasks that woke after their partial was superseded or cancelled.
    pub stale_timer_fires: usize,
    pub ignored: usize,
    pub interrupted: usize,
    pub passed: usize,
}

impl DiagnosticsSnapshot {
    pub fn decisions(&self) -> usize {
        self.ignored + self.interrupted + self.passed
    }
}
