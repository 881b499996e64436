use std::fmt::{self, Display};

use tokio::sync::Semaphore;

/// Concurrency is tracked with one semaphore permit per exchange, and waiting for in-flight
/// exchanges acquires all of them at once, which takes a `u32`.
const MAX_CONCURRENCY: usize = if Semaphore::MAX_PERMITS < u32::MAX as usize {
    Semaphore::MAX_PERMITS
} else {
    u32::MAX as usize
};

/// Bounded channels are backed by a semaphore too.
const MAX_QUEUE_SIZE: usize = Semaphore::MAX_PERMITS;

/// Limits on how many exchanges a route handles at once, and how many can wait.
///
/// When `queue_size` exchanges are already waiting, producers wait for space before their body is
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub struct RouteLimits {
    pub(crate) max_concurrency: usize,
    pub(crate) queue_size: usize,
}

impl RouteLimits {
    /// Limits the number of exchanges handled concurrently by the route.
    ///
    /// A value of zero is treated as one. Values above `u32::MAX` (or tokio's semaphore limit, if
    /// lower) are capped.
    pub fn with_max_concurrency(self, max: usize) -> Self {
        Self {
            max_concurrency: max.clamp(1, MAX_CONCURRENCY),
            ..self
        }
    }

    /// Limits the number of exchanges waiting to be handled.
    ///
    /// A value of zero is treated as one. Values above tokio's semaphore limit are capped.
    pub fn with_queue_size(self, size: usize) -> Self {
        Self {
            queue_size: size.clamp(1, MAX_QUEUE_SIZE),
            ..self
        }
    }

    /// The maximum number of exchanges handled concurrently.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// The maximum number of exchanges waiting to be handled.
    pub fn queue_size(&self) -> usize {
        self.queue_size
    }
}

impl Default for RouteLimits {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            queue_size: 100,
        }
    }
}

impl Display for RouteLimits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "concurrency: {}, queue_size: {}",
            self.max_concurrency, self.queue_size
        )
    }
}
