//! Bounded offload of CPU-bound work onto blocking threads
//!
//! HTTP handlers run on the tokio I/O threads and must never execute image
//! work inline. `BlockingPool::submit` moves a synchronous closure onto
//! `spawn_blocking`, with two explicit bounds the handlers can surface to
//! clients:
//!
//! - `workers` limits how many units execute simultaneously;
//! - `workers + queue_depth` limits how many units are admitted at all,
//!   so overload shows up as an immediate `Saturated` instead of
//!   unbounded queueing latency.
//!
//! A per-submission timeout covers queue wait plus execution. A timed-out
//! unit is not cancelled; it runs to completion on its blocking thread and
//! its result is discarded, which is why the worker permit travels inside
//! the closure rather than staying with the awaiting handler.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use metrics::{counter, gauge};
use tokio::sync::Semaphore;

use crate::config::OffloadConfig;

use super::types::ExtractError;

/// Bounded pool for synchronous, CPU-bound units of work
pub struct BlockingPool {
    workers: Arc<Semaphore>,
    admission: Arc<Semaphore>,
    timeout: Duration,
    in_flight: Arc<AtomicUsize>,
}

impl BlockingPool {
    pub fn new(config: &OffloadConfig) -> Self {
        Self {
            workers: Arc::new(Semaphore::new(config.workers)),
            admission: Arc::new(Semaphore::new(config.workers + config.queue_depth)),
            timeout: config.timeout,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of submissions currently being awaited
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Run `work` on a blocking thread and await its result.
    ///
    /// The work's own `Err` propagates verbatim; a panic inside the work
    /// surfaces as `ExtractError::Algorithm`, since the work is always an
    /// algorithm pipeline and a panic there is an algorithm failure.
    pub async fn submit<T, F>(&self, work: F) -> Result<T, ExtractError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    {
        let Ok(admitted) = self.admission.clone().try_acquire_owned() else {
            counter!("ifcb_offload_rejected_total").increment(1);
            return Err(ExtractError::Saturated);
        };

        let in_flight = self.in_flight.clone();
        gauge!("ifcb_offload_in_flight").set(in_flight.fetch_add(1, Ordering::Relaxed) as f64 + 1.0);

        let result = tokio::time::timeout(self.timeout, self.run(admitted, work)).await;

        gauge!("ifcb_offload_in_flight").set(in_flight.fetch_sub(1, Ordering::Relaxed) as f64 - 1.0);

        match result {
            Ok(outcome) => outcome,
            Err(_) => {
                counter!("ifcb_offload_timeouts_total").increment(1);
                Err(ExtractError::Timeout(self.timeout))
            }
        }
    }

    async fn run<T, F>(
        &self,
        admitted: tokio::sync::OwnedSemaphorePermit,
        work: F,
    ) -> Result<T, ExtractError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, ExtractError> + Send + 'static,
    {
        let worker = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExtractError::Internal("worker pool closed".to_string()))?;

        // Both permits move into the closure: if the awaiting side times out
        // or disconnects, the unit still counts against the bounds until it
        // actually finishes.
        let handle = tokio::task::spawn_blocking(move || {
            let _admitted = admitted;
            let _worker = worker;
            work()
        });

        match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => Err(ExtractError::Algorithm(format!(
                "worker panicked: {join_err}"
            ))),
            Err(join_err) => Err(ExtractError::Internal(format!(
                "worker task failed: {join_err}"
            ))),
        }
    }
}
