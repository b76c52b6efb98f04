use crate::{
    error::JobError,
    job::{JobDescriptor, JobId},
};

/// The outcome of running exactly one [`Job`](crate::Job).
///
/// A result either holds the value the body produced or the [`JobError`] that
/// explains why there is none. The two are mutually exclusive: a body that
/// fails cannot also hand back a value, so there is never a half-valid result
/// for the caller to second-guess.
#[derive(Clone, Debug)]
pub struct JobResult<V> {
    descriptor: JobDescriptor,
    outcome: Result<V, JobError>,
}

impl<V> JobResult<V> {
    pub(crate) const fn new(descriptor: JobDescriptor, outcome: Result<V, JobError>) -> Self {
        Self {
            descriptor,
            outcome,
        }
    }

    pub const fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    pub const fn id(&self) -> &JobId {
        self.descriptor.id()
    }

    pub const fn outcome(&self) -> &Result<V, JobError> {
        &self.outcome
    }

    /// The value, if the job succeeded.
    pub fn value(&self) -> Option<&V> {
        self.outcome.as_ref().ok()
    }

    /// The error, if the job did not succeed.
    pub fn error(&self) -> Option<&JobError> {
        self.outcome.as_ref().err()
    }

    pub const fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.error().is_some_and(JobError::is_cancelled)
    }

    pub fn into_outcome(self) -> Result<V, JobError> {
        self.outcome
    }

    pub fn into_parts(self) -> (JobDescriptor, Result<V, JobError>) {
        (self.descriptor, self.outcome)
    }
}
