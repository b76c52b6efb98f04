use crate::{
    error::JobError,
    job::Job,
    pool::tracker::Tracker,
    queue::JobQueue,
    result::JobResult,
};
use core::panic::AssertUnwindSafe;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Worker task: one concurrent execution lane of the pool.
///
/// Repeatedly takes a job from the shared queue, runs it, and hands its
/// result to the stream, until the queue is closed and drained. Workers are symmetric and
/// keep no state between jobs.
///
/// Every job taken yields exactly one result, whatever its body does:
///
/// - A body error is carried verbatim.
/// - A panicking body is caught and turned into [`JobError::Panicked`]; the
///   worker keeps going.
/// - Once `token` is cancelled, remaining jobs are not executed and yield
///   [`JobError::Cancelled`] instead.
pub(crate) async fn worker_loop<A, V>(
    worker_id: usize,
    queue: Arc<JobQueue<A, V>>,
    results: mpsc::Sender<JobResult<V>>,
    tracker: Arc<Tracker>,
    token: CancellationToken,
) where
    A: Send + 'static,
    V: Send + 'static,
{
    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} started");

    while let Some(job) = queue.take().await {
        let result = run_job(worker_id, job, &token).await;

        // A delivered result is counted by the stream when the caller takes
        // it. One that cannot be delivered is counted here.
        if let Err(_e) = results.send(result).await {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                "Worker {worker_id} could not deliver result for {}: stream closed",
                _e.0.id()
            );
            tracker.record_completed();
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Worker {worker_id} stopped");
}

/// Runs one job to completion and wraps the outcome.
#[allow(clippy::used_underscore_binding)]
pub(crate) async fn run_job<A, V>(
    _worker_id: usize,
    job: Job<A, V>,
    token: &CancellationToken,
) -> JobResult<V>
where
    A: Send + 'static,
    V: Send + 'static,
{
    let (descriptor, body, args) = job.into_parts();

    if token.is_cancelled() {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            "Worker {_worker_id} skipping {} ({}): cancelled",
            descriptor.id(),
            descriptor.kind()
        );
        return JobResult::new(descriptor, Err(JobError::Cancelled));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Worker {_worker_id} running {} ({})",
        descriptor.id(),
        descriptor.kind()
    );

    // Invoke the body inside the guarded future so that a panic while building
    // the future is caught too, not just one while polling it.
    let token = token.clone();
    let guarded = AssertUnwindSafe(async move { body.call(token, args).await }).catch_unwind();

    let outcome = match guarded.await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(JobError::from_body(err)),
        Err(payload) => {
            let err = JobError::from_panic(&*payload);
            #[cfg(feature = "tracing")]
            tracing::error!("Worker {_worker_id}: job {} {err}", descriptor.id());
            Err(err)
        }
    };

    #[cfg(feature = "tracing")]
    match &outcome {
        Ok(_) => tracing::debug!("Worker {_worker_id} finished {}", descriptor.id()),
        Err(err) => tracing::debug!("Worker {_worker_id} failed {}: {err}", descriptor.id()),
    }

    JobResult::new(descriptor, outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, Cancelled, JobDescriptor};
    use portable_atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn value_passes_through() {
        let job = Job::from_fn(
            JobDescriptor::new("b", "math"),
            |_token, n: i32| async move { Ok::<_, BoxError>(n) },
            42,
        );
        let result = run_job(0, job, &CancellationToken::new()).await;
        assert_eq!(result.value(), Some(&42));
    }

    #[tokio::test]
    async fn panic_while_polling_becomes_a_result() {
        let job = Job::from_fn(
            JobDescriptor::new("p", "crash"),
            |_token, ()| async move {
                if true {
                    panic!("kaboom");
                }
                Ok::<u8, BoxError>(0)
            },
            (),
        );
        let result = run_job(0, job, &CancellationToken::new()).await;
        assert_eq!(
            result.error().map(ToString::to_string).as_deref(),
            Some("job panicked: kaboom")
        );
    }

    #[tokio::test]
    async fn panic_while_building_the_future_becomes_a_result() {
        fn eager(_token: CancellationToken, _args: ()) -> futures::future::Ready<Result<u8, BoxError>> {
            panic!("eager");
        }
        let job = Job::from_fn(JobDescriptor::new("e", "crash"), eager, ());
        let result = run_job(0, job, &CancellationToken::new()).await;
        assert!(result.error().is_some_and(JobError::is_panic));
    }

    #[tokio::test]
    async fn cancelled_token_skips_the_body() {
        let token = CancellationToken::new();
        token.cancel();
        let ran = Arc::new(AtomicBool::new(false));
        let job = Job::from_fn(
            JobDescriptor::new("c", "move"),
            |_token, ran: Arc<AtomicBool>| async move {
                ran.store(true, Ordering::SeqCst);
                Ok::<_, BoxError>(())
            },
            Arc::clone(&ran),
        );
        let result: JobResult<()> = run_job(0, job, &token).await;
        assert!(result.is_cancelled());
        assert!(!ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn body_observing_the_token_reports_cancellation() {
        let token = CancellationToken::new();
        let job = Job::from_fn(
            JobDescriptor::new("slow", "move"),
            |token: CancellationToken, ()| async move {
                token.cancelled().await;
                Err::<(), BoxError>(Box::new(Cancelled))
            },
            (),
        );

        let cancel = token.clone();
        let (result, ()) = tokio::join!(run_job(0, job, &token), async move { cancel.cancel() });
        assert!(result.is_cancelled());
    }
}
