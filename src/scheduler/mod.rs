//! Refresh Scheduler (§4.I): a cooperative scheduler that runs registered
//! jobs at their interval, serially within each job, with cooperative
//! cancellation on `stop()`.

pub mod jobs;

pub use jobs::{Job, TokenRefresherJob, TtlRefresherJob};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{CoreError, ErrorBuilder, ErrorCode};

/// Intervals below this are rounded up (§8 boundary behavior).
const MIN_INTERVAL: Duration = Duration::from_secs(60);

pub struct Scheduler {
    jobs: std::sync::Mutex<Vec<Arc<dyn Job>>>,
    started: AtomicBool,
    cancel: CancellationToken,
    handles: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            jobs: std::sync::Mutex::new(Vec::new()),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            handles: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Registration after `start()` is rejected (§4.I).
    pub fn register(&self, job: Arc<dyn Job>) -> Result<(), CoreError> {
        if self.started.load(Ordering::SeqCst) {
            return Err(ErrorBuilder::new(ErrorCode::BadRequest, "scheduler already started: cannot register jobs").build());
        }
        self.jobs.lock().expect("scheduler jobs mutex poisoned").push(job);
        Ok(())
    }

    /// Schedules every registered job at its (rounded) interval. Idempotent.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let jobs = self.jobs.lock().expect("scheduler jobs mutex poisoned").clone();
        let mut handles = self.handles.lock().expect("scheduler handles mutex poisoned");
        for job in jobs {
            let cancel = self.cancel.clone();
            let interval = effective_interval(job.interval());
            handles.push(tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.tick().await; // first tick fires immediately; skip it
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = ticker.tick() => {
                            tracing::debug!(job = job.name(), "scheduler tick");
                            job.execute().await;
                        }
                    }
                }
            }));
        }
    }

    /// Cancels pending timers; in-flight executions are allowed to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        let handles = std::mem::take(&mut *self.handles.lock().expect("scheduler handles mutex poisoned"));
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

fn effective_interval(requested: Duration) -> Duration {
    if requested < MIN_INTERVAL {
        return MIN_INTERVAL;
    }
    let secs = requested.as_secs() / 60 * 60;
    Duration::from_secs(secs.max(60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sub_minute_intervals_round_up_to_one_minute() {
        assert_eq!(effective_interval(Duration::from_secs(10)), MIN_INTERVAL);
    }

    #[test]
    fn fractional_minutes_round_down() {
        assert_eq!(effective_interval(Duration::from_secs(125)), Duration::from_secs(120));
    }

    #[tokio::test]
    async fn registering_after_start_is_rejected() {
        let scheduler = Scheduler::new();
        scheduler.start();
        struct NoopJob;
        impl Job for NoopJob {
            fn name(&self) -> &str {
                "noop"
            }
            fn interval(&self) -> Duration {
                Duration::from_secs(60)
            }
            fn execute(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
                Box::pin(async {})
            }
        }
        assert!(scheduler.register(Arc::new(NoopJob)).is_err());
        scheduler.stop().await;
    }
}
