use std::{
    sync::{
        Arc, Mutex, PoisonError, Weak,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use futures::future::BoxFuture;
use tokio::{
    task::JoinHandle,
    time::{Instant, interval_at},
};
use tracing::trace;

const TICK_PERIOD: Duration = Duration::from_secs(1);

/// Receiver of countdown signals.
pub trait CountdownListener: Send + Sync {
    /// One period elapsed; `remaining` never goes below zero.
    fn on_tick(&self, remaining: u32) -> BoxFuture<'_, ()>;
    /// The count reached zero. Called at most once per run.
    fn on_expire(&self) -> BoxFuture<'_, ()>;
}

/// Cancellable periodic ticker with a terminal expiry signal.
///
/// Every run is tagged with a generation id. `stop` and `start` bump it, so a
/// tick already scheduled by an older run finds a stale id and exits without
/// calling the listener.
pub struct Countdown {
    generation: Arc<AtomicU64>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Countdown {
    /// An idle countdown ticking once per second when started.
    pub fn new() -> Self {
        Self {
            generation: Arc::new(AtomicU64::new(0)),
            task: Mutex::new(None),
        }
    }

    /// Start counting down from `total_seconds`, cancelling any previous run.
    pub fn start(&self, total_seconds: u32, listener: Weak<dyn CountdownListener>) {
        self.stop();

        let generation = self.generation.load(Ordering::SeqCst);
        let current = self.generation.clone();
        let period = TICK_PERIOD;
        let is_current = move || current.load(Ordering::SeqCst) == generation;

        let handle = tokio::spawn(async move {
            let mut remaining = total_seconds;
            let mut ticker = interval_at(Instant::now() + period, period);

            while remaining > 0 {
                ticker.tick().await;
                if !is_current() {
                    trace!(generation, "stale countdown tick ignored");
                    return;
                }
                let Some(listener) = listener.upgrade() else {
                    return;
                };
                remaining -= 1;
                listener.on_tick(remaining).await;
            }

            if is_current() {
                if let Some(listener) = listener.upgrade() {
                    listener.on_expire().await;
                }
            }
        });

        *self.lock_task() = Some(handle);
    }

    /// Cancel the current run. Idempotent.
    ///
    /// The task is detached rather than aborted: `stop` may be called from the
    /// listener while it runs inside the task itself.
    pub fn stop(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.lock_task().take();
    }

    /// True while a run is scheduled and has not finished.
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = task.take() {
            handle.abort();
        }
    }
}
