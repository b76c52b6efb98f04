//! Error types for the worker pool.
//!
//! Two families of errors live here and they never mix:
//!
//! - [`Error`] covers misuse of the pool or queue protocol (submitting after
//!   close, starting twice, ...). These are returned to whoever drove the pool
//!   and are never turned into a [`JobResult`].
//! - [`JobError`] is the failure half of a [`JobResult`]. It carries either
//!   the body's own error verbatim, a synthetic error for a body that
//!   panicked, or the distinguished [`JobError::Cancelled`] kind.
//!
//! [`JobResult`]: crate::JobResult

use core::any::Any;
use std::sync::Arc;

/// Boxed error returned by a job body.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A result type for pool and queue operations.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Protocol errors raised by [`WorkerPool`] and [`JobQueue`].
///
/// [`WorkerPool`]: crate::WorkerPool
/// [`JobQueue`]: crate::JobQueue
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// A pool needs at least one worker.
    #[error("worker count must be at least 1 (got {0})")]
    InvalidWorkerCount(usize),

    /// A bounded buffer was configured with zero capacity.
    #[error("{name} capacity must be at least 1")]
    InvalidCapacity { name: &'static str },

    /// [`WorkerPool::start`](crate::WorkerPool::start) was called more than
    /// once.
    #[error("worker pool already started")]
    AlreadyStarted,

    /// A job was submitted after the queue was closed, or the pool was fed a
    /// second time.
    #[error("job queue is closed")]
    QueueClosed,

    /// The single result stream was already handed out.
    #[error("result stream already taken")]
    ResultsTaken,
}

/// Marker error a job body returns when it gives up because its cancellation
/// token fired.
///
/// Workers translate it into [`JobError::Cancelled`], so a caller can tell a
/// job that was abandoned on shutdown apart from one that failed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("job cancelled")]
pub struct Cancelled;

/// Why a job did not produce a value.
#[derive(Clone, Debug, thiserror::Error)]
pub enum JobError {
    /// The body returned an error. It is carried as-is.
    #[error("{0}")]
    Failed(Arc<dyn std::error::Error + Send + Sync + 'static>),

    /// The body panicked. The panic was caught by the worker.
    #[error("job panicked: {message}")]
    Panicked { message: String },

    /// The shared token was cancelled before or while the job ran.
    #[error("job cancelled")]
    Cancelled,
}

impl JobError {
    /// Classifies an error returned by a job body.
    pub(crate) fn from_body(err: BoxError) -> Self {
        if err.is::<Cancelled>() {
            Self::Cancelled
        } else {
            Self::Failed(Arc::from(err))
        }
    }

    /// Builds the synthetic error for a caught panic.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::Panicked { message }
    }

    /// Returns `true` for [`JobError::Cancelled`].
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns `true` for [`JobError::Panicked`].
    pub const fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }

    /// Attempts to view the body's error as a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            Self::Failed(err) => err.downcast_ref::<E>(),
            _ => None,
        }
    }
}
