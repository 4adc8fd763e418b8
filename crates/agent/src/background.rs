//! Fire-and-forget work that outlives the response it was spawned for.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Default)]
struct Shared {
    in_flight: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when a task ends, panicked or not.
struct InFlight(Arc<Shared>);

impl InFlight {
    fn enter(shared: &Arc<Shared>) -> Self {
        shared.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(shared))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.0.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Tracks background cache writes and refresh legs.
///
/// Spawned tasks are never cancelled by the agent. [`settle`](Self::settle)
/// waits for everything spawned so far, including tasks spawned while it
/// waits. Any number of callers may settle at once.
#[derive(Clone, Default)]
pub struct BackgroundTasks {
    shared: Arc<Shared>,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` on the current runtime.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let guard = InFlight::enter(&self.shared);
        let handle = tokio::spawn(task);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "background task did not complete");
            }
        });
    }

    /// Wait until every background task has finished.
    pub async fn settle(&self) {
        loop {
            let idle = self.shared.idle.notified();
            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }
}
