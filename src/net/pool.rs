//! Fixed-size connection worker pool.
//!
//! # Responsibilities
//! - Run exactly `size` workers, each serving one job at a time
//! - Queue submitted jobs in a bounded channel
//! - Drain queued jobs on shutdown instead of cancelling them
//!
//! A panicking job is isolated in its own task so the worker that ran it
//! keeps going and the pool never shrinks.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;

/// A pool of workers consuming jobs of type `T`.
pub struct WorkerPool<T> {
    tx: Option<mpsc::Sender<T>>,
    workers: JoinSet<()>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Spawn `size` workers that run `handler` for each submitted job.
    pub fn spawn<F, Fut>(size: usize, queue_capacity: usize, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<T>(queue_capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let handler = Arc::new(handler);

        let mut workers = JoinSet::new();
        for worker_id in 0..size {
            let rx = Arc::clone(&rx);
            let handler = Arc::clone(&handler);
            workers.spawn(async move {
                loop {
                    // Only the receive is serialized; jobs run concurrently.
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };

                    if let Err(e) = tokio::spawn(handler(job)).await {
                        tracing::error!(worker_id, error = %e, "Worker job failed");
                    }
                }
                tracing::trace!(worker_id, "Worker exiting");
            });
        }

        tracing::debug!(size, queue_capacity, "Worker pool started");

        Self {
            tx: Some(tx),
            workers,
        }
    }

    /// Queue a job, waiting for space if the queue is full.
    ///
    /// Returns the job back if the pool has been closed.
    pub async fn submit(&self, job: T) -> Result<(), T> {
        match &self.tx {
            Some(tx) => tx.send(job).await.map_err(|e| e.0),
            None => Err(job),
        }
    }

    /// Stop accepting jobs, let workers finish everything queued, and wait for them.
    pub async fn shutdown(mut self) {
        self.tx.take();
        while let Some(result) = self.workers.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Worker task ended abnormally");
            }
        }
        tracing::debug!("Worker pool drained");
    }
}
