//! Counting semaphore with a bounded wait queue (spec.md §5).
//!
//! `acquire` returns a guard immediately when a permit is free; if none is
//! free and the wait queue is already at capacity, it rejects without
//! waiting (`backpressure_rejected`); otherwise it counts itself as queued
//! and waits up to a configured timeout before giving up (`timeout`).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ResolverError;

pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    queue_capacity: usize,
    queued: AtomicUsize,
    wait_timeout: Duration,
}

impl ConcurrencyLimiter {
    pub fn new(max_concurrent: usize, queue_capacity: usize, wait_timeout: Duration) -> Self {
        ConcurrencyLimiter {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            queue_capacity,
            queued: AtomicUsize::new(0),
            wait_timeout,
        }
    }

    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, ResolverError> {
        if let Ok(permit) = self.semaphore.clone().try_acquire_owned() {
            return Ok(permit);
        }

        if self.queued.fetch_add(1, Ordering::AcqRel) >= self.queue_capacity {
            self.queued.fetch_sub(1, Ordering::AcqRel);
            return Err(ResolverError::BackpressureRejected);
        }

        let result = tokio::time::timeout(self.wait_timeout, self.semaphore.clone().acquire_owned()).await;
        self.queued.fetch_sub(1, Ordering::AcqRel);

        match result {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(ResolverError::Internal("concurrency semaphore closed".to_string())),
            Err(_) => Err(ResolverError::Timeout),
        }
    }
}
