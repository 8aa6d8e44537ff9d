//! Run status watching

use sage_backend::{BackendError, RunStatusReport, RunStatusSource, StatusPoller};

/// One status line: run id, status, then the error or result if present
#[must_use]
pub fn status_line(report: &RunStatusReport) -> String {
    let mut line = format!("{} {}", report.run_id, report.status);
    if let Some(error) = &report.error {
        line.push_str(": ");
        line.push_str(error);
    } else if let Some(results) = &report.results {
        line.push(' ');
        line.push_str(&results.to_string());
    }
    line
}

/// Fetch a run's status once, or poll until it is terminal
///
/// Every observed report is passed to `on_update`.
///
/// # Errors
/// Returns the fetch error in `once` mode, or
/// [`BackendError::PollingAborted`] when polling gives up
pub async fn watch_run<S, F>(
    source: &S,
    poller: &StatusPoller,
    run_id: &str,
    once: bool,
    mut on_update: F,
) -> Result<RunStatusReport, BackendError>
where
    S: RunStatusSource + ?Sized,
    F: FnMut(&RunStatusReport) + Send,
{
    if once {
        let report = source.run_status(run_id).await?;
        on_update(&report);
        return Ok(report);
    }
    poller.poll_until_terminal(source, run_id, on_update).await
}
