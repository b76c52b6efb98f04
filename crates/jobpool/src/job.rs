//! The job model: what a unit of work is and how it is invoked.
//!
//! A [`Job`] pairs an immutable [`JobDescriptor`] with the body that performs
//! the work and the arguments the body is called with. The pool never looks
//! inside the body or the arguments; it only moves them to a worker, invokes
//! the body once, and attributes the outcome back to the descriptor.

use crate::error::BoxError;
use core::fmt;
use futures::future::BoxFuture;
use std::{collections::BTreeMap, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Free-form data attached to a [`JobDescriptor`]. Never interpreted by the
/// pool.
pub type Metadata = BTreeMap<String, String>;

/// Identifier of a job, unique among the jobs of one run.
///
/// Only used to attribute results and in diagnostics. It plays no part in
/// scheduling order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Classification tag of a job, used for logging.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct JobKind(String);

impl JobKind {
    pub fn new(kind: impl Into<String>) -> Self {
        Self(kind.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobKind {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Immutable description of a job: who it is and what kind of work it does.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct JobDescriptor {
    id: JobId,
    kind: JobKind,
    metadata: Option<Metadata>,
}

impl JobDescriptor {
    pub fn new(id: impl Into<JobId>, kind: impl Into<JobKind>) -> Self {
        Self {
            id: id.into(),
            kind: kind.into(),
            metadata: None,
        }
    }

    /// Attaches metadata. Consumes the descriptor so it stays immutable once
    /// built.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub const fn id(&self) -> &JobId {
        &self.id
    }

    pub const fn kind(&self) -> &JobKind {
        &self.kind
    }

    pub const fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }
}

/// The executable part of a job.
///
/// A body receives the pool's shared [`CancellationToken`] and the job's
/// arguments, and resolves to either a value or an error. Cancellation is
/// cooperative: a body that wants to stop early should watch the token and
/// return [`Cancelled`](crate::Cancelled). The token must not be retained past
/// the returned future.
///
/// Bodies are invoked concurrently with each other, so they must be
/// `Send + Sync`. Any `Fn(CancellationToken, A) -> impl Future` closure with
/// the right output is a body.
pub trait JobBody<A, V>: Send + Sync + 'static {
    fn call(&self, token: CancellationToken, args: A) -> BoxFuture<'static, Result<V, BoxError>>;
}

impl<F, Fut, A, V> JobBody<A, V> for F
where
    F: Fn(CancellationToken, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
{
    fn call(&self, token: CancellationToken, args: A) -> BoxFuture<'static, Result<V, BoxError>> {
        Box::pin(self(token, args))
    }
}

/// One schedulable unit of work.
///
/// The body is shared behind an [`Arc`] so that a producer can build a single
/// body and hand it to many jobs with different arguments.
pub struct Job<A, V> {
    descriptor: JobDescriptor,
    body: Arc<dyn JobBody<A, V>>,
    args: A,
}

impl<A, V> Job<A, V> {
    pub fn new(descriptor: JobDescriptor, body: Arc<dyn JobBody<A, V>>, args: A) -> Self {
        Self {
            descriptor,
            body,
            args,
        }
    }

    /// Builds a job from a closure body.
    pub fn from_fn<F, Fut>(descriptor: JobDescriptor, body: F, args: A) -> Self
    where
        F: Fn(CancellationToken, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, BoxError>> + Send + 'static,
        A: 'static,
        V: 'static,
    {
        Self::new(descriptor, Arc::new(body), args)
    }

    pub const fn descriptor(&self) -> &JobDescriptor {
        &self.descriptor
    }

    pub const fn args(&self) -> &A {
        &self.args
    }

    pub(crate) fn into_parts(self) -> (JobDescriptor, Arc<dyn JobBody<A, V>>, A) {
        (self.descriptor, self.body, self.args)
    }
}

impl<A: fmt::Debug, V> fmt::Debug for Job<A, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("descriptor", &self.descriptor)
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_accessors() {
        let mut metadata = Metadata::new();
        metadata.insert("source".into(), "camera".into());
        let descriptor = JobDescriptor::new("IMG_20200101.jpg", "move").with_metadata(metadata);

        assert_eq!(descriptor.id().as_str(), "IMG_20200101.jpg");
        assert_eq!(descriptor.kind().to_string(), "move");
        assert_eq!(
            descriptor.metadata().and_then(|m| m.get("source")),
            Some(&"camera".to_string())
        );
    }

    #[tokio::test]
    async fn closure_bodies_are_callable_through_the_trait() {
        let job = Job::from_fn(
            JobDescriptor::new("double", "math"),
            |_token, n: u32| async move { Ok::<_, BoxError>(n * 2) },
            21,
        );
        assert_eq!(*job.args(), 21);

        let (_, body, args) = job.into_parts();
        let value = body.call(CancellationToken::new(), args).await.unwrap();
        assert_eq!(value, 42);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn descriptor_serializes_transparently() {
        let descriptor = JobDescriptor::new("a", "move");
        let json = serde_json::to_string(&descriptor).unwrap();
        assert_eq!(json, r#"{"id":"a","kind":"move","metadata":null}"#);
        let back: JobDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, descriptor);
    }
}
