//! One run of the sorter: list, feed the pool, report.

use crate::sorter::{
    config::SorterConfig,
    patterns::DatePatterns,
    producers::producer_for,
    tasks::{SortContext, SortOutcome, into_jobs},
};
use jobpool::{CancellationToken, Done, JobError, JobResult, PoolConfig, Results, WorkerPool};
use std::{fmt, sync::Arc};

/// Tally of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    /// Listed but never queued because the run was interrupted first.
    pub not_started: usize,
    pub moved: usize,
    pub moved_to_others: usize,
    pub skipped: usize,
    pub removed: usize,
    pub kept: usize,
}

impl Summary {
    /// Jobs that produced a result.
    pub const fn answered(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    fn record(&mut self, result: JobResult<SortOutcome>) {
        let (descriptor, outcome) = result.into_parts();
        match outcome {
            Ok(outcome) => {
                tracing::debug!("{} {}: {outcome}", descriptor.kind(), descriptor.id());
                self.succeeded += 1;
                match outcome {
                    SortOutcome::Moved { .. } => self.moved += 1,
                    SortOutcome::MovedToOthers { .. } => self.moved_to_others += 1,
                    SortOutcome::Skipped => self.skipped += 1,
                    SortOutcome::Removed => self.removed += 1,
                    SortOutcome::Kept => self.kept += 1,
                }
            }
            Err(JobError::Cancelled) => {
                tracing::debug!("{} {}: cancelled", descriptor.kind(), descriptor.id());
                self.cancelled += 1;
            }
            Err(e) => {
                tracing::warn!("Job {} ({}) failed: {e}", descriptor.id(), descriptor.kind());
                self.failed += 1;
            }
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} jobs: {} succeeded, {} failed, {} cancelled, {} not started \
             (moved {}, moved to others {}, skipped {}, removed {}, kept {})",
            self.answered() + self.not_started,
            self.succeeded,
            self.failed,
            self.cancelled,
            self.not_started,
            self.moved,
            self.moved_to_others,
            self.skipped,
            self.removed,
            self.kept,
        )
    }
}

/// Runs the configured mode to completion.
///
/// `shutdown` resolves when the user asks to stop; `token` is then cancelled,
/// which stops queueing and answers every queued job as cancelled.
pub async fn run<S>(
    config: &SorterConfig,
    token: CancellationToken,
    shutdown: S,
) -> anyhow::Result<Summary>
where
    S: Future<Output = ()>,
{
    let context = Arc::new(SortContext {
        root: config.root.clone(),
        others_dir: config.others_dir.clone(),
        patterns: DatePatterns::new(config.min_year, config.max_year)?,
    });

    let pool = Arc::new(WorkerPool::with_config(
        PoolConfig::new(config.num_workers)
            .with_queue_capacity(config.queue_capacity)
            .with_result_capacity(config.result_buffer_size),
    )?);
    let results = pool.results()?;
    let done = pool.done();
    pool.start(token.clone())?;

    let producer = producer_for(config.mode, context);
    let feeder = {
        let pool = Arc::clone(&pool);
        tokio::spawn(async move {
            let tasks = match tokio::task::spawn_blocking(move || producer.produce()).await {
                Ok(tasks) => tasks,
                Err(e) => {
                    tracing::error!("Listing failed: {e}");
                    Vec::new()
                }
            };
            tracing::info!("Listed {} jobs", tasks.len());
            pool.feed(into_jobs(tasks)).await
        })
    };

    let mut summary = drain(results, done, &token, shutdown).await;

    let report = feeder.await??;
    summary.not_started = report.rejected;
    pool.join().await;

    Ok(summary)
}

/// Collects results until the stream ends, cancelling `token` if `shutdown`
/// resolves first.
async fn drain<S>(
    mut results: Results<SortOutcome>,
    mut done: Done,
    token: &CancellationToken,
    shutdown: S,
) -> Summary
where
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut summary = Summary::default();
    let mut finished = false;
    let mut interrupted = false;

    loop {
        tokio::select! {
            next = results.recv() => match next {
                Some(result) => summary.record(result),
                None => break,
            },
            _ = done.wait(), if !finished => {
                finished = true;
                tracing::debug!("Every queued job has been answered");
            }
            () = &mut shutdown, if !interrupted => {
                interrupted = true;
                tracing::info!("Interrupted, cancelling the remaining jobs");
                token.cancel();
            }
        }
    }

    summary
}
