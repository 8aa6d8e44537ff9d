//! Experiment status polling
//!
//! Re-fetches a run's status at a fixed interval until the run reaches a
//! terminal status. A background poll is tied to its [`PollHandle`]:
//! dropping the handle aborts the task, so nothing keeps polling once the
//! owner is gone.

use crate::client::ResearchBackend;
use crate::config::PollingConfig;
use crate::error::BackendError;
use crate::wire::RunStatusReport;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Anything that can report a run's status
#[async_trait]
pub trait RunStatusSource: Send + Sync {
    /// Fetch the current status of a run
    async fn run_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError>;
}

#[async_trait]
impl<T: ResearchBackend + ?Sized> RunStatusSource for T {
    async fn run_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError> {
        self.experiment_status(run_id).await
    }
}

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Fixed-interval status poller
#[derive(Debug, Clone, Copy)]
pub struct StatusPoller {
    interval: Duration,
    max_consecutive_failures: u32,
}

impl StatusPoller {
    /// Create poller from configuration
    #[inline]
    #[must_use]
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            interval: config.interval(),
            max_consecutive_failures: config.max_consecutive_failures.max(1),
        }
    }

    /// With a different interval, floored at one millisecond
    #[inline]
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval.max(MIN_INTERVAL);
        self
    }

    /// Interval between fetches
    #[inline]
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Poll until the run reaches a terminal status
    ///
    /// The first fetch happens immediately. `on_update` sees every
    /// successful report, including the terminal one.
    ///
    /// # Errors
    /// Returns [`BackendError::PollingAborted`] after
    /// `max_consecutive_failures` failed fetches in a row
    pub async fn poll_until_terminal<S, F>(
        &self,
        source: &S,
        run_id: &str,
        mut on_update: F,
    ) -> Result<RunStatusReport, BackendError>
    where
        S: RunStatusSource + ?Sized,
        F: FnMut(&RunStatusReport) + Send,
    {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            ticker.tick().await;
            match source.run_status(run_id).await {
                Ok(report) => {
                    failures = 0;
                    tracing::debug!(run_id, status = ?report.status, "polled run status");
                    on_update(&report);
                    if report.is_terminal() {
                        tracing::info!(run_id, status = ?report.status, "run finished");
                        return Ok(report);
                    }
                }
                Err(e) => {
                    failures += 1;
                    tracing::warn!(run_id, failures, error = %e, "status poll failed");
                    if failures >= self.max_consecutive_failures {
                        return Err(BackendError::PollingAborted {
                            run_id: run_id.to_string(),
                            failures,
                        });
                    }
                }
            }
        }
    }

    /// Poll in a background task
    #[must_use]
    pub fn spawn<S>(self, source: Arc<S>, run_id: impl Into<String>) -> PollHandle
    where
        S: RunStatusSource + ?Sized + 'static,
    {
        let run_id = run_id.into();
        let (tx, rx) = watch::channel(None);
        let task_run_id = run_id.clone();
        let task = tokio::spawn(async move {
            self.poll_until_terminal(source.as_ref(), &task_run_id, move |report| {
                let _ = tx.send(Some(report.clone()));
            })
            .await
        });
        PollHandle {
            run_id,
            updates: rx,
            task: Some(task),
        }
    }
}

impl Default for StatusPoller {
    fn default() -> Self {
        Self::new(&PollingConfig::default())
    }
}

/// Owner of a background poll
///
/// Dropping the handle stops polling.
#[derive(Debug)]
pub struct PollHandle {
    run_id: String,
    updates: watch::Receiver<Option<RunStatusReport>>,
    task: Option<JoinHandle<Result<RunStatusReport, BackendError>>>,
}

impl PollHandle {
    /// Run being polled
    #[inline]
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Most recent report, if any arrived yet
    #[must_use]
    pub fn latest(&self) -> Option<RunStatusReport> {
        self.updates.borrow().clone()
    }

    /// Wait for the next report; `None` once polling has ended
    pub async fn changed(&mut self) -> Option<RunStatusReport> {
        match self.updates.changed().await {
            Ok(()) => self.updates.borrow_and_update().clone(),
            Err(_) => None,
        }
    }

    /// Whether the background task has ended
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the terminal report
    ///
    /// # Errors
    /// Returns the polling error, or [`BackendError::PollingAborted`] if the
    /// task was cancelled
    pub async fn finish(mut self) -> Result<RunStatusReport, BackendError> {
        let Some(task) = self.task.take() else {
            return Err(self.aborted());
        };
        match task.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(self.aborted()),
        }
    }

    fn aborted(&self) -> BackendError {
        BackendError::PollingAborted {
            run_id: self.run_id.clone(),
            failures: 0,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                tracing::debug!(run_id = %self.run_id, "stopping status poll");
            }
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_tree::RunStatus;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Replays scripted results, repeating the last one forever
    struct Script {
        steps: Mutex<VecDeque<Result<RunStatus, u16>>>,
        calls: AtomicUsize,
    }

    impl Script {
        fn new(steps: Vec<Result<RunStatus, u16>>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl RunStatusSource for Script {
        async fn run_status(&self, run_id: &str) -> Result<RunStatusReport, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = {
                let mut steps = self.steps.lock().unwrap();
                if steps.len() > 1 {
                    steps.pop_front().unwrap()
                } else {
                    *steps.front().unwrap()
                }
            };
            match step {
                Ok(status) => Ok(RunStatusReport::new(run_id, status)),
                Err(code) => Err(BackendError::Status {
                    status: code,
                    message: String::new(),
                }),
            }
        }
    }

    fn poller() -> StatusPoller {
        StatusPoller::default()
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_terminal_status() {
        let script = Script::new(vec![
            Ok(RunStatus::Pending),
            Ok(RunStatus::Running),
            Ok(RunStatus::Completed),
        ]);
        let mut seen = Vec::new();
        let start = tokio::time::Instant::now();
        let report = poller()
            .poll_until_terminal(script.as_ref(), "r1", |r| seen.push(r.status))
            .await
            .unwrap();

        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(
            seen,
            vec![RunStatus::Pending, RunStatus::Running, RunStatus::Completed]
        );
        assert_eq!(script.calls(), 3);
        // Immediate first fetch, then two 5s intervals.
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_and_error_are_terminal() {
        for terminal in [RunStatus::Failed, RunStatus::Error] {
            let script = Script::new(vec![Ok(RunStatus::Running), Ok(terminal)]);
            let report = poller()
                .poll_until_terminal(script.as_ref(), "r", |_| {})
                .await
                .unwrap();
            assert_eq!(report.status, terminal);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_reset_the_counter() {
        let script = Script::new(vec![
            Err(502),
            Err(502),
            Ok(RunStatus::Running),
            Err(502),
            Ok(RunStatus::Completed),
        ]);
        let report = poller()
            .poll_until_terminal(script.as_ref(), "r", |_| {})
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(script.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_consecutive_failures() {
        let script = Script::new(vec![Ok(RunStatus::Running), Err(500)]);
        let err = poller()
            .poll_until_terminal(script.as_ref(), "r9", |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BackendError::PollingAborted { ref run_id, failures: 3 } if run_id == "r9"
        ));
        assert_eq!(script.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_poll_reports_updates_and_finishes() {
        let script = Script::new(vec![Ok(RunStatus::Running), Ok(RunStatus::Completed)]);
        let mut handle = poller().spawn(script.clone(), "r1");
        assert_eq!(handle.run_id(), "r1");

        let first = handle.changed().await.unwrap();
        assert_eq!(first.status, RunStatus::Running);

        let report = handle.finish().await.unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(script.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_config_polls_once_per_second() {
        let config = PollingConfig {
            interval_secs: 0,
            ..PollingConfig::default()
        };
        let poller = StatusPoller::new(&config);
        assert_eq!(poller.interval(), Duration::from_secs(1));

        let script = Script::new(vec![Ok(RunStatus::Running), Ok(RunStatus::Completed)]);
        let start = tokio::time::Instant::now();
        let report = poller
            .poll_until_terminal(script.as_ref(), "r1", |_| {})
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Completed);
        assert_eq!(start.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_override_is_floored() {
        let poller = poller().with_interval(Duration::ZERO);
        assert_eq!(poller.interval(), Duration::from_millis(1));

        let script = Script::new(vec![Ok(RunStatus::Completed)]);
        let report = poller
            .poll_until_terminal(script.as_ref(), "r1", |_| {})
            .await
            .unwrap();
        assert_eq!(report.status, RunStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_tracks_latest_report_and_completion() {
        let script = Script::new(vec![Ok(RunStatus::Running), Ok(RunStatus::Completed)]);
        let mut handle = poller().spawn(script.clone(), "r1");
        assert!(handle.latest().is_none());
        assert!(!handle.is_finished());

        handle.changed().await.unwrap();
        assert_eq!(handle.latest().unwrap().status, RunStatus::Running);

        let last = handle.changed().await.unwrap();
        assert_eq!(last.status, RunStatus::Completed);
        // The sender is dropped when the task ends.
        assert!(handle.changed().await.is_none());
        assert!(handle.is_finished());
        assert_eq!(handle.latest().unwrap().status, RunStatus::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_handle_stops_polling() {
        let script = Script::new(vec![Ok(RunStatus::Running)]);
        let mut handle = poller().spawn(script.clone(), "r1");
        handle.changed().await.unwrap();
        drop(handle);

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(script.calls(), 1);
    }
}
