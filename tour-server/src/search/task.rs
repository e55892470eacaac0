//! Delayed, cancellable units of work.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;

/// Handle to a spawned continuation that runs after a delay.
///
/// Dropping the handle detaches the task; only [`ScheduledTask::cancel`]
/// stops it. A task may therefore replace its own handle while it runs.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    started: Arc<AtomicBool>,
}

impl ScheduledTask {
    /// Run `body` on the runtime straight away.
    pub fn now<F>(body: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self::after(Duration::ZERO, body)
    }

    /// Run `body` once `delay` has elapsed. A zero delay skips the timer.
    pub fn after<F>(delay: Duration, body: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let started = Arc::new(AtomicBool::new(false));
        let flag = started.clone();
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            flag.store(true, Ordering::SeqCst);
            body.await;
        });
        Self { handle, started }
    }

    /// Stop the task if its body has not started yet.
    ///
    /// A body that is already running is left to finish, so a request it has
    /// in flight gets its answer. Bodies must check for themselves whether
    /// that answer is still wanted.
    pub fn cancel(&self) {
        if !self.has_started() {
            self.handle.abort();
        }
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
