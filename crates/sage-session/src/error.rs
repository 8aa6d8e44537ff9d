//! Error types for the research session
//!
//! Tree operations never fail; errors here come from the backend or from
//! running a step before its inputs exist.

use sage_backend::BackendError;
use sage_tree::{RunStatus, StepKind};

/// Session error
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Backend call failed
    #[error("backend error: {0}")]
    Backend(#[from] BackendError),

    /// An upstream step has no output yet
    #[error("step {0} has no output yet")]
    MissingPrerequisite(StepKind),

    /// Analysis needs a completed run
    #[error("experiment run has not completed (status: {0:?})")]
    RunNotFinished(RunStatus),
}

impl SessionError {
    /// Check if resubmitting may succeed without other changes
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::MissingPrerequisite(_) | Self::RunNotFinished(_) => false,
        }
    }

    /// Plain message suitable for showing next to a form
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Backend(e) => e.user_message(),
            Self::MissingPrerequisite(kind) => format!("Complete the {kind} step first."),
            Self::RunNotFinished(status) => {
                format!("The experiment run is not complete (status: {status:?}).")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_prerequisite_message_names_step() {
        let err = SessionError::MissingPrerequisite(StepKind::ExperimentConfig);
        assert_eq!(err.to_string(), "step experiment-config has no output yet");
        assert_eq!(err.user_message(), "Complete the experiment-config step first.");
        assert!(!err.is_retryable());
    }

    #[test]
    fn backend_errors_convert() {
        let err: SessionError = BackendError::Status {
            status: 503,
            message: "busy".to_string(),
        }
        .into();
        assert!(err.is_retryable());
        assert_eq!(err.user_message(), "busy");
    }
}
