//! Job Scheduler
//!
//! Fire-and-forget dispatch of execution worker runs. Sub-tasks are
//! embarrassingly parallel: the pool is N executors pulling from one queue,
//! with cooperative shutdown via a cancellation token. Signaled retries are
//! re-enqueued after an exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::services::worker::{ExecutionOutcome, ExecutionWorker};

/// Fire-and-forget dispatch of one execution worker run.
pub trait JobScheduler: Send + Sync {
    fn enqueue(&self, subtask_id: &str);
}

/// Configuration for the worker pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of concurrent executors
    pub concurrency: usize,
    /// Base delay for retry re-enqueue; actual delay is base * 2^retries
    pub retry_backoff: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            retry_backoff: Duration::from_secs(1),
        }
    }
}

/// A pool of N concurrent executors pulling sub-task ids from a queue.
pub struct WorkerPool {
    tx: mpsc::UnboundedSender<String>,
    token: CancellationToken,
}

impl WorkerPool {
    /// Start the pool. Must be called from within a tokio runtime.
    pub fn start(worker: Arc<ExecutionWorker>, config: PoolConfig) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let rx = Arc::new(Mutex::new(rx));
        let token = CancellationToken::new();

        for _ in 0..config.concurrency.max(1) {
            let worker = Arc::clone(&worker);
            let rx = Arc::clone(&rx);
            let tx = tx.clone();
            let token = token.clone();
            let backoff = config.retry_backoff;

            tokio::spawn(async move {
                loop {
                    let next = tokio::select! {
                        _ = token.cancelled() => break,
                        next = async { rx.lock().await.recv().await } => next,
                    };
                    let Some(subtask_id) = next else { break };

                    match worker.execute(&subtask_id).await {
                        Ok(ExecutionOutcome::RetryScheduled { retry_count }) => {
                            // The core mandates no in-process delay; the
                            // backoff here is this scheduling layer's policy.
                            let delay = backoff.saturating_mul(1 << retry_count.min(6));
                            let tx = tx.clone();
                            let token = token.clone();
                            tokio::spawn(async move {
                                tokio::select! {
                                    _ = token.cancelled() => {}
                                    _ = tokio::time::sleep(delay) => {
                                        let _ = tx.send(subtask_id);
                                    }
                                }
                            });
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!(subtask_id = %subtask_id, error = %e, "worker dispatch failed");
                        }
                    }
                }
            });
        }

        Arc::new(Self { tx, token })
    }

    /// Request cooperative shutdown. In-flight provider calls are not
    /// preempted; executors stop after their current dispatch.
    pub fn shutdown(&self) {
        self.token.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl JobScheduler for WorkerPool {
    fn enqueue(&self, subtask_id: &str) {
        if self.tx.send(subtask_id.to_string()).is_err() {
            warn!(subtask_id, "enqueue after pool shutdown, dropping");
        }
    }
}
