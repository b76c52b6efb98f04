//! Completion bookkeeping shared by the feeder and the workers.
//!
//! Completion is a pair of monotonic counters plus a "submission closed"
//! flag. A result is completed when the caller takes it from the stream (or
//! when a worker fails to deliver it). Whoever moves last (the feeder closing
//! submission, or the stream handing out the final result) observes
//! `closed && completed == submitted` and fires the signal. All accesses are
//! `SeqCst`: the feeder writes `closed` then reads `completed`, the stream
//! writes `completed` then reads `closed`, so at least one of them sees both
//! writes.

use crate::sink::{Done, DoneTrigger};
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};

/// Lifecycle of a [`WorkerPool`](crate::WorkerPool).
///
/// `Idle -> Running -> Draining -> Done`. `Done` is terminal. A pool fed an
/// empty job list may reach `Done` without ever running.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolState {
    /// Constructed, workers not spawned yet.
    Idle,
    /// Workers are running and submission is still open.
    Running,
    /// Submission has closed; workers are finishing what is left.
    Draining,
    /// Every submitted job has delivered its result.
    Done,
}

#[derive(Debug)]
pub(crate) struct Tracker {
    submitted: AtomicUsize,
    completed: AtomicUsize,
    started: AtomicBool,
    fed: AtomicBool,
    closed: AtomicBool,
    done: DoneTrigger,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let (done, _) = DoneTrigger::new();
        Self {
            submitted: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            fed: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            done,
        }
    }

    /// Returns `false` if the pool was already started.
    pub(crate) fn mark_started(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    /// Returns `false` if the pool was already fed.
    pub(crate) fn mark_fed(&self) -> bool {
        !self.fed.swap(true, Ordering::SeqCst)
    }

    pub(crate) fn record_submitted(&self) {
        self.submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::SeqCst);
        self.try_complete();
    }

    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.try_complete();
    }

    fn try_complete(&self) {
        if !self.closed.load(Ordering::SeqCst) {
            return;
        }
        let submitted = self.submitted.load(Ordering::SeqCst);
        let completed = self.completed.load(Ordering::SeqCst);
        debug_assert!(completed <= submitted, "more results than jobs");
        if completed == submitted && self.done.fire() {
            #[cfg(feature = "tracing")]
            tracing::debug!("All {submitted} jobs delivered, pool done");
        }
    }

    pub(crate) fn done(&self) -> Done {
        self.done.subscribe()
    }

    /// Snapshot of `(submitted, completed)`.
    pub(crate) fn counts(&self) -> (usize, usize) {
        (
            self.submitted.load(Ordering::SeqCst),
            self.completed.load(Ordering::SeqCst),
        )
    }

    pub(crate) fn state(&self) -> PoolState {
        if self.done.is_set() {
            PoolState::Done
        } else if !self.started.load(Ordering::SeqCst) {
            PoolState::Idle
        } else if self.closed.load(Ordering::SeqCst) {
            PoolState::Draining
        } else {
            PoolState::Running
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_submission_completes_on_close() {
        let tracker = Tracker::new();
        let done = tracker.done();
        assert_eq!(tracker.state(), PoolState::Idle);
        tracker.close();
        assert!(done.is_done());
        assert_eq!(tracker.state(), PoolState::Done);
    }

    #[test]
    fn completion_waits_for_close_and_every_result() {
        let tracker = Tracker::new();
        let done = tracker.done();
        assert!(tracker.mark_started());
        assert!(!tracker.mark_started());

        tracker.record_submitted();
        tracker.record_submitted();
        tracker.record_completed();
        tracker.record_completed();
        // Results caught up but the feeder has not closed yet.
        assert!(!done.is_done());
        assert_eq!(tracker.state(), PoolState::Running);

        tracker.record_submitted();
        tracker.close();
        assert!(!done.is_done());
        assert_eq!(tracker.state(), PoolState::Draining);

        tracker.record_completed();
        assert!(done.is_done());
        assert_eq!(tracker.counts(), (3, 3));
    }
}
