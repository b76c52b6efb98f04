//! The worker pool: lifecycle, feeding and completion.
//!
//! This module defines [`WorkerPool`], which owns a fixed set of asynchronous
//! workers, the bounded [`JobQueue`] they share, the result stream and the
//! completion signal. A caller drives it through four operations:
//!
//! - [`WorkerPool::start`] spawns the workers under a shared
//!   [`CancellationToken`] and returns immediately.
//! - [`WorkerPool::feed`] submits a sequence of jobs and then closes the
//!   queue. It can run concurrently with `start`.
//! - [`WorkerPool::results`] hands out the [`Results`] stream.
//! - [`WorkerPool::done`] hands out the one-shot [`Done`] signal.
//!
//! Every job that makes it into the queue yields exactly one result, and
//! [`Done`] fires once after the last of them has been delivered.

use crate::{
    config::PoolConfig,
    error::{Error, Result},
    job::Job,
    pool::{
        tracker::{PoolState, Tracker},
        worker::worker_loop,
    },
    queue::{JobQueue, Submission},
    result::JobResult,
    sink::{Done, Results},
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;

/// What [`WorkerPool::feed`] did with the jobs it was given.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedReport {
    /// Jobs that entered the queue. Each of them yields one result.
    pub submitted: usize,
    /// Jobs dropped without being enqueued because the pool was cancelled.
    /// These yield no result.
    pub rejected: usize,
}

/// A fixed-size pool of asynchronous workers sharing one bounded job queue.
///
/// `A` is the argument type handed to job bodies and `V` the value type they
/// produce.
pub struct WorkerPool<A, V> {
    config: PoolConfig,
    queue: Arc<JobQueue<A, V>>,
    tracker: Arc<Tracker>,
    // Pool-internal token. Linked to the caller's token on `start`, and used
    // by `feed` to stop submitting.
    token: CancellationToken,
    result_tx: Mutex<Option<mpsc::Sender<JobResult<V>>>>,
    results: Mutex<Option<Results<V>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<A, V> WorkerPool<A, V>
where
    A: Send + 'static,
    V: Send + 'static,
{
    /// Creates an idle pool with `workers` workers and default buffer sizes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWorkerCount`] if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self> {
        Self::with_config(PoolConfig::new(workers))
    }

    /// Creates an idle pool from an explicit [`PoolConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the worker count or either capacity is zero.
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;

        let queue = JobQueue::bounded(config.queue_capacity)?;
        let tracker = Arc::new(Tracker::new());
        let (result_tx, result_rx) = mpsc::channel(config.result_capacity);

        Ok(Self {
            config,
            queue: Arc::new(queue),
            results: Mutex::new(Some(Results::new(result_rx, Arc::clone(&tracker)))),
            tracker,
            token: CancellationToken::new(),
            result_tx: Mutex::new(Some(result_tx)),
            handles: Mutex::new(Vec::with_capacity(config.workers)),
        })
    }

    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    pub fn state(&self) -> PoolState {
        self.tracker.state()
    }

    /// Snapshot of `(submitted, completed)` job counts.
    pub fn stats(&self) -> (usize, usize) {
        self.tracker.counts()
    }

    /// Spawns the workers on the current Tokio runtime and returns without
    /// waiting for them.
    ///
    /// `token` is shared by every job body. Cancelling it stops `feed` from
    /// submitting further jobs and makes workers answer every job still in
    /// the queue with [`JobError::Cancelled`](crate::JobError::Cancelled)
    /// instead of running it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if called more than once.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&self, token: CancellationToken) -> Result<()> {
        if !self.tracker.mark_started() {
            return Err(Error::AlreadyStarted);
        }
        let Some(result_tx) = self.result_tx.lock().take() else {
            return Err(Error::AlreadyStarted);
        };

        #[cfg(feature = "tracing")]
        tracing::debug!("Starting worker pool with {} workers", self.config.workers);

        // Forward the caller's cancellation into the pool token. The link
        // goes away once the pool is done or cancelled by other means.
        {
            let pool_token = self.token.clone();
            let mut done = self.tracker.done();
            tokio::spawn(async move {
                tokio::select! {
                    () = token.cancelled() => pool_token.cancel(),
                    () = pool_token.cancelled() => {}
                    _ = done.wait() => {}
                }
            });
        }

        let mut handles = self.handles.lock();
        for worker_id in 0..self.config.workers {
            handles.push(tokio::spawn(worker_loop(
                worker_id,
                Arc::clone(&self.queue),
                result_tx.clone(),
                Arc::clone(&self.tracker),
                self.token.clone(),
            )));
        }
        // Only the workers hold senders now, so the result stream ends when
        // the last worker exits.
        drop(result_tx);

        Ok(())
    }

    /// Submits every job from `jobs` in order, then closes the queue.
    ///
    /// Waits whenever the queue is full. Once the pool is cancelled, the
    /// remaining jobs are dropped without being submitted and counted in
    /// [`FeedReport::rejected`]. Jobs are never started here; that is the
    /// workers' business, so a pool can be fed before it is started as long
    /// as the queue has room.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the pool has already been fed.
    pub async fn feed<I>(&self, jobs: I) -> Result<FeedReport>
    where
        I: IntoIterator<Item = Job<A, V>>,
    {
        if !self.tracker.mark_fed() {
            return Err(Error::QueueClosed);
        }

        let mut report = FeedReport::default();
        for job in jobs {
            match self.queue.submit(job, &self.token).await {
                Ok(Submission::Enqueued) => {
                    self.tracker.record_submitted();
                    report.submitted += 1;
                }
                Ok(Submission::Rejected(_job)) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!("Rejected {} after cancellation", _job.descriptor().id());
                    report.rejected += 1;
                }
                Err(e) => {
                    self.close_submission();
                    return Err(e);
                }
            }
        }

        self.close_submission();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Feed finished: {} submitted, {} rejected",
            report.submitted,
            report.rejected
        );

        Ok(report)
    }

    // The tracker is closed before the queue. Workers exit once they see the
    // queue closed and empty, which ends the result stream, and by then
    // completion must already be decidable.
    fn close_submission(&self) {
        self.tracker.close();
        if let Err(_e) = self.queue.close() {
            #[cfg(feature = "tracing")]
            tracing::trace!("Queue already closed: {_e}");
        }
    }

    /// Hands out the result stream.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultsTaken`] on every call after the first.
    pub fn results(&self) -> Result<Results<V>> {
        self.results.lock().take().ok_or(Error::ResultsTaken)
    }

    /// Returns a handle to the completion signal.
    pub fn done(&self) -> Done {
        self.tracker.done()
    }

    /// Cancels the pool, exactly as if the token given to
    /// [`WorkerPool::start`] had been cancelled.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Waits for every worker task to exit.
    ///
    /// Workers exit once the queue is closed and drained, so this resolves
    /// after [`Done`] has fired. It returns immediately for a pool that was
    /// never started.
    pub async fn join(&self) {
        let handles = core::mem::take(&mut *self.handles.lock());
        for _handle in futures::future::join_all(handles).await {
            #[cfg(feature = "tracing")]
            if let Err(e) = _handle {
                tracing::error!("Worker task failed: {e}");
            }
        }
    }
}
