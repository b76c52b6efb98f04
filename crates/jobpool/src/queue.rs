//! Bounded multi-producer/multi-consumer job queue.
//!
//! The queue sits between whoever feeds jobs and the workers. It is a bounded
//! Tokio MPSC channel whose receiving half is shared by all workers behind an
//! async mutex, so the channel itself does the load balancing: whichever worker
//! is waiting gets the next job.
//!
//! ## Blocking behaviour
//!
//! - [`JobQueue::submit`] waits for a free slot when the buffer is full, unless
//!   the cancellation token fires first.
//! - [`JobQueue::take`] waits for a job, and returns `None` only once the queue
//!   is closed and every buffered job has been handed out.

use crate::{
    error::{Error, Result},
    job::Job,
};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc};
use tokio_util::sync::CancellationToken;

/// What happened to a job handed to [`JobQueue::submit`].
#[derive(Debug)]
pub enum Submission<A, V> {
    /// The job is in the queue and will reach a worker.
    Enqueued,
    /// The token was cancelled, so the job was not enqueued. It is handed back
    /// untouched.
    Rejected(Job<A, V>),
}

impl<A, V> Submission<A, V> {
    pub const fn is_enqueued(&self) -> bool {
        matches!(self, Self::Enqueued)
    }
}

pub struct JobQueue<A, V> {
    tx: Mutex<Option<mpsc::Sender<Job<A, V>>>>,
    rx: AsyncMutex<mpsc::Receiver<Job<A, V>>>,
    capacity: usize,
}

impl<A, V> JobQueue<A, V> {
    /// Creates an open queue that buffers up to `capacity` jobs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCapacity`] if `capacity` is zero.
    pub fn bounded(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { name: "queue" });
        }
        let (tx, rx) = mpsc::channel(capacity);
        Ok(Self {
            tx: Mutex::new(Some(tx)),
            rx: AsyncMutex::new(rx),
            capacity,
        })
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }

    /// Enqueues `job`, waiting for room if the buffer is full.
    ///
    /// If `token` is already cancelled, or becomes cancelled while waiting for
    /// room, the job is not enqueued and comes back as
    /// [`Submission::Rejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the queue was closed. Submitting after
    /// close is a bug in the producer.
    pub async fn submit(&self, job: Job<A, V>, token: &CancellationToken) -> Result<Submission<A, V>> {
        // Clone the sender out of the lock so the wait for capacity does not
        // hold it.
        let Some(tx) = self.tx.lock().clone() else {
            return Err(Error::QueueClosed);
        };

        tokio::select! {
            biased;
            () = token.cancelled() => Ok(Submission::Rejected(job)),
            permit = tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(job);
                    Ok(Submission::Enqueued)
                }
                Err(_) => Err(Error::QueueClosed),
            },
        }
    }

    /// Marks the end of submission. Jobs already buffered are still delivered.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QueueClosed`] if the queue was already closed.
    pub fn close(&self) -> Result<()> {
        match self.tx.lock().take() {
            Some(_) => Ok(()),
            None => Err(Error::QueueClosed),
        }
    }

    /// Takes the next job, or `None` once the queue is closed and drained.
    pub async fn take(&self) -> Option<Job<A, V>> {
        self.rx.lock().await.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, JobDescriptor};
    use core::time::Duration;
    use std::sync::Arc;

    fn job(id: &str) -> Job<(), ()> {
        Job::from_fn(
            JobDescriptor::new(id, "test"),
            |_token, ()| async { Ok::<_, BoxError>(()) },
            (),
        )
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            JobQueue::<(), ()>::bounded(0),
            Err(Error::InvalidCapacity { name: "queue" })
        ));
    }

    #[tokio::test]
    async fn buffered_jobs_survive_close() -> Result<()> {
        let queue = JobQueue::bounded(4)?;
        let token = CancellationToken::new();

        assert!(queue.submit(job("a"), &token).await?.is_enqueued());
        assert!(queue.submit(job("b"), &token).await?.is_enqueued());
        queue.close()?;
        assert!(queue.is_closed());

        assert_eq!(queue.take().await.unwrap().descriptor().id().as_str(), "a");
        assert_eq!(queue.take().await.unwrap().descriptor().id().as_str(), "b");
        assert!(queue.take().await.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn submit_after_close_fails_loudly() -> Result<()> {
        let queue = JobQueue::bounded(1)?;
        queue.close()?;

        let err = queue
            .submit(job("late"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, Error::QueueClosed);
        assert_eq!(queue.close(), Err(Error::QueueClosed));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_token_rejects_without_enqueuing() -> Result<()> {
        let queue = JobQueue::bounded(1)?;
        let token = CancellationToken::new();
        token.cancel();

        match queue.submit(job("x"), &token).await? {
            Submission::Rejected(job) => assert_eq!(job.descriptor().id().as_str(), "x"),
            Submission::Enqueued => panic!("cancelled submit must not enqueue"),
        }

        queue.close()?;
        assert!(queue.take().await.is_none());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_queue_blocks_until_cancelled() -> Result<()> {
        let queue = Arc::new(JobQueue::bounded(1)?);
        let token = CancellationToken::new();

        assert!(queue.submit(job("first"), &token).await?.is_enqueued());

        let blocked = {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            tokio::spawn(async move { queue.submit(job("second"), &token).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!blocked.is_finished());

        token.cancel();
        let submission = blocked.await.expect("submit task panicked")?;
        assert!(!submission.is_enqueued());
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn full_queue_unblocks_when_a_job_is_taken() -> Result<()> {
        let queue = Arc::new(JobQueue::bounded(1)?);
        let token = CancellationToken::new();

        assert!(queue.submit(job("first"), &token).await?.is_enqueued());

        let pending = {
            let queue = Arc::clone(&queue);
            let token = token.clone();
            tokio::spawn(async move { queue.submit(job("second"), &token).await })
        };

        assert!(queue.take().await.is_some());
        let submission = pending.await.expect("submit task panicked")?;
        assert!(submission.is_enqueued());
        Ok(())
    }
}
