use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("worker pool is shut down")]
pub struct PoolClosed;

/// Runs at most `max_concurrent` tasks at once. Once `cancel` fires no
/// new task is started; tasks already running are left to finish.
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(max_concurrent: usize, cancel: CancellationToken) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            cancel,
        }
    }

    /// Waits for a free worker, then spawns `f` on it.
    pub async fn spawn<F>(&self, f: F) -> Result<tokio::task::JoinHandle<F::Output>, PoolClosed>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return Err(PoolClosed);
        }
        let semaphore = Arc::clone(&self.semaphore);
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(PoolClosed),
            permit = semaphore.acquire_owned() => permit.map_err(|_| PoolClosed)?,
        };
        let handle = tokio::spawn(async move {
            let _permit = permit;
            f.await
        });
        Ok(handle)
    }
}
