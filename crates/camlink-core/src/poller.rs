//! Adaptive interval poller.
//!
//! Self-rescheduling: each run schedules the next one after it completes,
//! so a slow poll function naturally lengthens the effective period. A
//! failed poll multiplies the interval by the backoff factor (capped); a
//! successful poll resets it to the initial value. Built on `tokio::time`
//! so tests under a paused clock observe exact cadences.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::config::PollConfig;

/// Poll callback: returns true on success (reset interval), false on
/// failure (back off).
pub type PollFn = Box<dyn FnMut() -> Pin<Box<dyn Future<Output = bool> + Send>> + Send>;

struct Running {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Interval scheduler with failure backoff and explicit start/stop.
pub struct AdaptivePoller {
    initial: Duration,
    factor: f64,
    max: Duration,
    poll_fn: Arc<tokio::sync::Mutex<PollFn>>,
    running: Mutex<Option<Running>>,
}

impl AdaptivePoller {
    pub fn new(cfg: &PollConfig, poll_fn: PollFn) -> Self {
        Self {
            initial: Duration::from_secs(cfg.interval_secs.max(1)),
            factor: cfg.backoff_factor.max(1.0),
            max: Duration::from_secs(cfg.max_interval_secs.max(cfg.interval_secs.max(1))),
            poll_fn: Arc::new(tokio::sync::Mutex::new(poll_fn)),
            running: Mutex::new(None),
        }
    }

    /// Begin polling; the first run happens one initial interval from now.
    /// No-op if already running.
    pub fn start(&self) {
        let mut running = self.running.lock().unwrap();
        if running.as_ref().is_some_and(|r| !r.task.is_finished()) {
            return;
        }
        let (stop, mut stopped) = watch::channel(false);
        let poll_fn = Arc::clone(&self.poll_fn);
        let initial = self.initial;
        let factor = self.factor;
        let max = self.max;
        let task = tokio::spawn(async move {
            // Interval state lives in the task: a stop/start cycle always
            // resumes at the original cadence.
            let mut interval = initial;
            loop {
                tokio::select! {
                    _ = sleep(interval) => {}
                    // Fires on stop or when the poller itself is dropped.
                    _ = stopped.changed() => return,
                }
                let run = {
                    let mut f = poll_fn.lock().await;
                    f()
                };
                // The run is never cancelled mid-flight; stop takes effect
                // at the next loop iteration.
                let ok = run.await;
                interval = if ok {
                    initial
                } else {
                    let next = interval.as_secs_f64() * factor;
                    Duration::from_secs_f64(next.min(max.as_secs_f64()))
                };
            }
        });
        *running = Some(Running { stop, task });
    }

    /// Stop polling. Cooperative: an in-flight run is left to finish, and
    /// the loop exits before the next sleep. The interval implicitly
    /// resets; a future `start()` begins at the initial cadence.
    pub fn stop(&self) {
        if let Some(running) = self.running.lock().unwrap().take() {
            let _ = running.stop.send(true);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|r| !r.task.is_finished())
    }

    /// Swap the polled function. Takes effect from the next scheduled run.
    pub async fn update_function(&self, poll_fn: PollFn) {
        *self.poll_fn.lock().await = poll_fn;
    }
}

impl Drop for AdaptivePoller {
    fn drop(&mut self) {
        self.stop();
    }
}
