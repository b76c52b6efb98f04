use crate::error::{Error, Result};

/// Sizing of a [`WorkerPool`](crate::WorkerPool).
///
/// Everything here is fixed for the lifetime of the pool. There is no dynamic
/// resizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Number of jobs buffered between the feeder and the workers. Submitting
    /// blocks when the buffer is full.
    pub queue_capacity: usize,
    /// Number of results buffered between the workers and the caller. Workers
    /// block when the caller falls behind.
    pub result_capacity: usize,
}

impl PoolConfig {
    /// A configuration with `workers` workers and buffers sized to match.
    pub const fn new(workers: usize) -> Self {
        Self {
            workers,
            queue_capacity: workers,
            result_capacity: workers,
        }
    }

    #[must_use]
    pub const fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    #[must_use]
    pub const fn with_result_capacity(mut self, result_capacity: usize) -> Self {
        self.result_capacity = result_capacity;
        self
    }

    /// # Errors
    ///
    /// Returns an error if the worker count or either capacity is zero.
    pub const fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::InvalidWorkerCount(self.workers));
        }
        if self.queue_capacity == 0 {
            return Err(Error::InvalidCapacity { name: "queue" });
        }
        if self.result_capacity == 0 {
            return Err(Error::InvalidCapacity { name: "result" });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_default_to_worker_count() {
        let config = PoolConfig::new(3);
        assert_eq!(config.queue_capacity, 3);
        assert_eq!(config.result_capacity, 3);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn zero_values_are_invalid() {
        assert_eq!(
            PoolConfig::new(0).validate(),
            Err(Error::InvalidWorkerCount(0))
        );
        assert_eq!(
            PoolConfig::new(2).with_queue_capacity(0).validate(),
            Err(Error::InvalidCapacity { name: "queue" })
        );
        assert_eq!(
            PoolConfig::new(2).with_result_capacity(0).validate(),
            Err(Error::InvalidCapacity { name: "result" })
        );
    }
}
