//! The caller-facing end of the pool: the result stream and the completion
//! signal.

use crate::{pool::tracker::Tracker, result::JobResult};
use core::{
    pin::Pin,
    task::{Context, Poll},
};
use futures::Stream;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::ReceiverStream;

/// Stream of [`JobResult`]s in completion order.
///
/// Results arrive in whatever order workers finish, not in submission order.
/// The stream ends once every worker has exited, which happens after the
/// queue is closed and drained. It can be consumed either with
/// [`Results::recv`] or as a [`Stream`].
///
/// A result counts as delivered when it is handed out here, so once [`Done`]
/// has fired the stream yields nothing more.
#[derive(Debug)]
pub struct Results<V> {
    inner: ReceiverStream<JobResult<V>>,
    tracker: Arc<Tracker>,
}

impl<V> Results<V> {
    pub(crate) fn new(rx: mpsc::Receiver<JobResult<V>>, tracker: Arc<Tracker>) -> Self {
        Self {
            inner: ReceiverStream::new(rx),
            tracker,
        }
    }

    /// Waits for the next result. Returns `None` once the stream is exhausted.
    pub async fn recv(&mut self) -> Option<JobResult<V>> {
        let next = self.inner.as_mut().recv().await;
        if next.is_some() {
            self.tracker.record_completed();
        }
        next
    }
}

impl<V> Stream for Results<V> {
    type Item = JobResult<V>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let next = Pin::new(&mut self.inner).poll_next(cx);
        if let Poll::Ready(Some(_)) = &next {
            self.tracker.record_completed();
        }
        next
    }
}

impl<V> Drop for Results<V> {
    // Buffered results are discarded but still count towards completion.
    // Later sends fail and are counted by the worker.
    fn drop(&mut self) {
        let rx = self.inner.as_mut();
        rx.close();
        while rx.try_recv().is_ok() {
            self.tracker.record_completed();
        }
    }
}

/// One-shot completion signal.
///
/// Fires exactly once, when submission has ended and every submitted job has
/// delivered its result to the stream. Cheap to clone; every clone observes
/// the same signal.
#[derive(Clone, Debug)]
pub struct Done {
    rx: watch::Receiver<bool>,
}

impl Done {
    pub(crate) const fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx }
    }

    pub fn is_done(&self) -> bool {
        *self.rx.borrow()
    }

    /// Waits for completion.
    ///
    /// Returns `false` if the pool was dropped before completing, in which
    /// case completion will never be observed.
    pub async fn wait(&mut self) -> bool {
        self.rx.wait_for(|done| *done).await.is_ok()
    }
}

/// Sending half of the completion signal. Setting it is idempotent.
#[derive(Debug)]
pub(crate) struct DoneTrigger {
    tx: watch::Sender<bool>,
}

impl DoneTrigger {
    pub(crate) fn new() -> (Self, Done) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, Done::new(rx))
    }

    pub(crate) fn subscribe(&self) -> Done {
        Done::new(self.tx.subscribe())
    }

    pub(crate) fn is_set(&self) -> bool {
        *self.tx.borrow()
    }

    /// Sets the signal. Returns `true` only for the call that flipped it.
    pub(crate) fn fire(&self) -> bool {
        self.tx.send_if_modified(|done| {
            if *done {
                false
            } else {
                *done = true;
                true
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JobDescriptor;
    use futures::StreamExt;

    #[test]
    fn done_fires_once() {
        let (trigger, done) = DoneTrigger::new();
        assert!(!done.is_done());
        assert!(trigger.fire());
        assert!(!trigger.fire());
        assert!(done.is_done());
        assert!(trigger.subscribe().is_done());
    }

    #[tokio::test]
    async fn wait_reports_a_dropped_trigger() {
        let (trigger, mut done) = DoneTrigger::new();
        drop(trigger);
        assert!(!done.wait().await);
    }

    fn submitted(count: usize) -> Arc<Tracker> {
        let tracker = Arc::new(Tracker::new());
        for _ in 0..count {
            tracker.record_submitted();
        }
        tracker.close();
        tracker
    }

    #[tokio::test]
    async fn results_work_as_a_stream() {
        let tracker = submitted(2);
        let (tx, rx) = mpsc::channel(2);
        let mut results = Results::new(rx, Arc::clone(&tracker));

        tx.send(JobResult::new(JobDescriptor::new("a", "t"), Ok(1)))
            .await
            .unwrap();
        tx.send(JobResult::new(JobDescriptor::new("b", "t"), Ok(2)))
            .await
            .unwrap();
        drop(tx);

        assert_eq!(results.recv().await.unwrap().value(), Some(&1));
        assert_eq!(tracker.counts(), (2, 1));
        assert_eq!(results.next().await.unwrap().value(), Some(&2));
        assert_eq!(tracker.counts(), (2, 2));
        assert!(results.next().await.is_none());
    }

    #[tokio::test]
    async fn done_waits_for_buffered_results_to_be_taken() {
        let tracker = submitted(3);
        let mut done = tracker.done();
        let (tx, rx) = mpsc::channel(4);
        let mut results = Results::new(rx, Arc::clone(&tracker));

        for i in 0..3 {
            tx.send(JobResult::new(JobDescriptor::new(format!("job{i}"), "t"), Ok(i)))
                .await
                .unwrap();
        }
        drop(tx);
        assert!(!done.is_done(), "results still sit in the buffer");

        let mut taken = 0;
        while results.recv().await.is_some() {
            taken += 1;
        }
        assert_eq!(taken, 3);
        assert!(done.wait().await);
    }

    #[tokio::test]
    async fn dropping_the_stream_counts_what_was_buffered() {
        let tracker = submitted(2);
        let (tx, rx) = mpsc::channel(2);
        let results = Results::new(rx, Arc::clone(&tracker));

        tx.send(JobResult::new(JobDescriptor::new("a", "t"), Ok(1)))
            .await
            .unwrap();
        tx.send(JobResult::new(JobDescriptor::new("b", "t"), Ok(2)))
            .await
            .unwrap();
        drop(results);

        assert_eq!(tracker.counts(), (2, 2));
        assert!(tracker.done().is_done());
        assert!(tx.is_closed());
    }
}
