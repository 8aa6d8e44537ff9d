//! Error types for the research backend client
//!
//! Covers:
//! - Bad backend URLs
//! - Transport failures
//! - Non-success HTTP statuses
//! - Undecodable responses
//! - Status polling that gave up

/// Backend call error
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Base URL or endpoint could not be built
    #[error("invalid backend url: {0}")]
    InvalidUrl(String),

    /// Request never produced a response
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("backend returned {status}: {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Backend error message or body
        message: String,
    },

    /// Response body did not match the expected shape
    #[error("could not decode backend response: {0}")]
    Decode(String),

    /// Status polling stopped before a terminal status
    #[error("status polling for run {run_id} stopped after {failures} consecutive failures")]
    PollingAborted {
        /// Run being polled
        run_id: String,
        /// Consecutive failed polls
        failures: u32,
    },
}

impl BackendError {
    /// Check if resubmitting the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::PollingAborted { .. } => true,
            Self::InvalidUrl(_) | Self::Decode(_) => false,
        }
    }

    /// Plain message suitable for showing next to a form
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Status { message, .. } if !message.is_empty() => message.clone(),
            Self::Transport(_) => "Could not reach the research backend.".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_display() {
        let err = BackendError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        };
        assert_eq!(err.to_string(), "backend returned 502: bad gateway");
        assert_eq!(err.user_message(), "bad gateway");
    }

    #[test]
    fn retry_classification() {
        let server = BackendError::Status {
            status: 503,
            message: String::new(),
        };
        let client = BackendError::Status {
            status: 422,
            message: String::new(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!BackendError::Decode("x".to_string()).is_retryable());
        assert!(BackendError::PollingAborted {
            run_id: "r".to_string(),
            failures: 3
        }
        .is_retryable());
    }

    #[test]
    fn empty_status_message_falls_back_to_display() {
        let err = BackendError::Status {
            status: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), "backend returned 500: ");
    }
}
