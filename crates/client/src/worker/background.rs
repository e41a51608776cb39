//! Detached tasks with isolated error capture.

use std::future::Future;
use std::sync::{Mutex, PoisonError};

use tokio::task::JoinHandle;

use harbor_core::Error;

/// Tracker for fire-and-forget work.
///
/// A detached task never reports back to the response path: its error is
/// logged at `warn` and dropped.
#[derive(Debug, Default)]
pub struct BackgroundTasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl BackgroundTasks {
    /// Spawn a detached task.
    pub fn spawn<F>(&self, label: &'static str, task: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            if let Err(e) = task.await {
                tracing::warn!(task = label, error = %e, "background task failed");
            }
        });
        self.push(handle);
    }

    /// Detach an already running task, discarding its value.
    pub fn track<T>(&self, label: &'static str, handle: JoinHandle<Result<T, Error>>)
    where
        T: Send + 'static,
    {
        self.spawn(label, async move {
            match handle.await {
                Ok(result) => result.map(|_| ()),
                Err(e) => Err(Error::TaskFailed(e.to_string())),
            }
        });
    }

    /// Number of detached tasks still running.
    pub fn pending(&self) -> usize {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.len()
    }

    /// Wait until every detached task, including ones spawned meanwhile, is done.
    pub async fn settle(&self) {
        loop {
            let batch = std::mem::take(&mut *self.handles.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                return;
            }
            for handle in batch {
                if let Err(e) = handle.await {
                    tracing::warn!(error = %e, "background task aborted");
                }
            }
        }
    }

    fn push(&self, handle: JoinHandle<()>) {
        let mut handles = self.handles.lock().unwrap_or_else(PoisonError::into_inner);
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_settle_waits_for_tasks() {
        let tasks = BackgroundTasks::default();
        let done = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let done = done.clone();
            tasks.spawn("count", async move {
                tokio::task::yield_now().await;
                done.fetch_add(1, Ordering::SeqCst);
                Ok(())
            });
        }

        tasks.settle().await;
        assert_eq!(done.load(Ordering::SeqCst), 3);
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_failures_are_contained() {
        let tasks = BackgroundTasks::default();
        tasks.spawn("fails", async { Err(Error::Network("offline".into())) });
        tasks.track("fails-too", tokio::spawn(async { Err::<u8, _>(Error::Network("offline".into())) }));

        tasks.settle().await;
        assert_eq!(tasks.pending(), 0);
    }

    #[tokio::test]
    async fn test_track_panicking_task() {
        let tasks = BackgroundTasks::default();
        let handle: JoinHandle<Result<(), Error>> = tokio::spawn(async { panic!("boom") });
        tasks.track("panics", handle);

        tasks.settle().await;
    }
}
