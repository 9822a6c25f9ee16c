use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use thiserror::Error;
use tokio::task::JoinHandle;

/// Shared cancellation signal checked by long-running work.
#[derive(Clone, Debug, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Error, Debug)]
pub enum JobError {
    #[error("Background job timed out")]
    TimedOut,
    #[error("Background job failed: {0}")]
    Failed(String),
}

/// Blocking work moved off the caller's thread onto the tokio blocking pool.
///
/// Cancelling only sets the flag; the work itself decides how to stop (the
/// decompiler kills its subprocess).
pub struct BackgroundJob<T> {
    cancel: CancelFlag,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> BackgroundJob<T> {
    /// Must be called from within a tokio runtime.
    pub fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(CancelFlag) -> T + Send + 'static,
    {
        let cancel = CancelFlag::new();
        let worker_flag = cancel.clone();
        let handle = tokio::task::spawn_blocking(move || work(worker_flag));
        Self { cancel, handle }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub async fn join(self) -> Result<T, JobError> {
        self.handle
            .await
            .map_err(|error| JobError::Failed(error.to_string()))
    }

    /// Waits up to `timeout`. On expiry the job is cancelled and awaited so
    /// nothing it started outlives this call.
    pub async fn join_timeout(self, timeout: Duration) -> Result<T, JobError> {
        let BackgroundJob { cancel, mut handle } = self;
        match tokio::time::timeout(timeout, &mut handle).await {
            Ok(result) => result.map_err(|error| JobError::Failed(error.to_string())),
            Err(_) => {
                cancel.cancel();
                let _ = handle.await;
                Err(JobError::TimedOut)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn wait_for_cancel(flag: CancelFlag) -> bool {
        let started = Instant::now();
        while !flag.is_cancelled() {
            if started.elapsed() > Duration::from_secs(10) {
                return false;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        true
    }

    #[tokio::test]
    async fn join_returns_work_result() {
        let job = BackgroundJob::spawn(|_| 21 * 2);
        assert_eq!(job.join().await.expect("join"), 42);
    }

    #[tokio::test]
    async fn cancel_is_visible_to_the_worker() {
        let job = BackgroundJob::spawn(wait_for_cancel);
        job.cancel();
        assert!(job.join().await.expect("join"));
    }

    #[tokio::test]
    async fn join_timeout_cancels_slow_work() {
        let job = BackgroundJob::spawn(wait_for_cancel);
        let flag = job.cancel_flag();
        let result = job.join_timeout(Duration::from_millis(20)).await;
        assert!(matches!(result, Err(JobError::TimedOut)));
        assert!(flag.is_cancelled());
    }
}
