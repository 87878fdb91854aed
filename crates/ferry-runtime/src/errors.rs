//! Runtime error taxonomy.

use thiserror::Error;

use ferry_core::unit::Unit;

/// Terminal errors for one request.
///
/// Classification and cache failures never appear here — they are
/// recovered inside the routing layer. What remains is what the caller
/// actually has to hear about.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The target unit reported a non-recoverable error.
    #[error("unit {unit} failed: {detail}")]
    DispatchFailed {
        /// Unit that failed.
        unit: Unit,
        /// Unit-reported detail.
        detail: String,
    },

    /// The target unit exceeded its dispatch timeout.
    #[error("dispatch to {unit} timed out after {timeout_ms}ms")]
    DispatchTimeout {
        /// Unit that timed out.
        unit: Unit,
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The caller disconnected; the request was abandoned.
    #[error("request cancelled by caller")]
    Cancelled,

    /// Malformed pipeline state or other internal invariant violation.
    #[error("internal pipeline error: {0}")]
    Internal(String),
}

impl RuntimeError {
    /// Generic, user-visible description. Unit-internal details stay in
    /// the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::DispatchFailed { .. } | Self::DispatchTimeout { .. } | Self::Internal(_) => {
                "We could not process your request. Please try again."
            }
            Self::Cancelled => "The request was cancelled.",
        }
    }

    /// Whether this error came from the dispatch stage.
    #[must_use]
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            Self::DispatchFailed { .. } | Self::DispatchTimeout { .. }
        )
    }
}

/// Conversation persistence failure. Always non-fatal to the pipeline.
#[derive(Debug, Error)]
pub enum ConversationError {
    /// The backing store is unreachable.
    #[error("conversation store unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_errors_are_dispatch_failures() {
        let failed = RuntimeError::DispatchFailed {
            unit: Unit::Knowledge,
            detail: "index offline".into(),
        };
        let timeout = RuntimeError::DispatchTimeout {
            unit: Unit::Knowledge,
            timeout_ms: 30_000,
        };
        assert!(failed.is_dispatch_failure());
        assert!(timeout.is_dispatch_failure());
        assert!(!RuntimeError::Cancelled.is_dispatch_failure());
    }

    #[test]
    fn user_message_hides_internal_detail() {
        let err = RuntimeError::DispatchFailed {
            unit: Unit::Analytics,
            detail: "connection pool exhausted on replica 3".into(),
        };
        assert!(!err.user_message().contains("replica"));
    }

    #[test]
    fn display_includes_unit_and_timeout() {
        let err = RuntimeError::DispatchTimeout {
            unit: Unit::Commerce,
            timeout_ms: 5_000,
        };
        let text = err.to_string();
        assert!(text.contains("commerce"));
        assert!(text.contains("5000ms"));
    }
}
