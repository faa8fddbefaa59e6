//! Fire-and-forget work that must outlive the request which started it.
//!
//! Tasks inherit the caller's trace id. A panicking task is logged and
//! contained. Shutdown waits for outstanding tasks through
//! [`BackgroundTasks::wait_until`].

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{error, info, warn};

use super::TraceId;

/// Registry of spawned background tasks.
#[derive(Clone)]
pub struct BackgroundTasks {
    handle: Handle,
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundTasks {
    /// Registry spawning onto `handle`.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Arc::new(Mutex::new(JoinSet::new())),
        }
    }

    /// Start `task` in the background.
    pub fn spawn<F>(&self, name: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guarded = TraceId::propagate(async move {
            if AssertUnwindSafe(task).catch_unwind().await.is_err() {
                error!(task = name, "background task panicked");
            }
        });
        let mut tasks = self.tasks.lock();
        while tasks.try_join_next().is_some() {}
        tasks.spawn_on(guarded, &self.handle);
    }

    /// Number of tasks not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Wait for every outstanding task for at most `timeout`.
    pub async fn wait(&self, timeout: Duration) -> bool {
        self.wait_until(Instant::now() + timeout).await
    }

    /// Wait for every outstanding task until the `deadline` instant.
    ///
    /// Shutdown passes the deadline it already started counting down, so
    /// draining workers and draining tasks share one budget. Returns `true`
    /// when all tasks finished in time; stragglers are aborted otherwise.
    pub async fn wait_until(&self, deadline: Instant) -> bool {
        let mut tasks = std::mem::take(&mut *self.tasks.lock());
        if tasks.is_empty() {
            return true;
        }
        info!(count = tasks.len(), "waiting for background tasks");
        let drained = tokio::time::timeout_at(deadline, async {
            while tasks.join_next().await.is_some() {}
        })
        .await
        .is_ok();
        if !drained {
            warn!(remaining = tasks.len(), "background tasks still running at deadline");
            tasks.abort_all();
        }
        drained
    }
}
