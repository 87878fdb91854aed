//! Gateway error types.
//!
//! Every failure mode is a typed variant so callers branch on data, not on
//! exception shape. The classifier treats all of these identically (fall
//! back), but retry policy and logging need the distinctions.

use thiserror::Error;

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors surfaced by the embedding/completion gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The call exceeded its deadline.
    #[error("gateway call timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// Credentials are missing or malformed.
    #[error("gateway auth error: {message}")]
    Auth {
        /// What went wrong.
        message: String,
    },

    /// Transport-level failure (connect, TLS, read).
    #[error("gateway transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("gateway API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
        /// Whether retrying may help.
        retryable: bool,
    },

    /// The response body was not valid JSON.
    #[error("gateway returned invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The response parsed but did not match the expected shape.
    #[error("gateway returned an unexpected response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether a retry is worth attempting.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Api { retryable, .. } => *retryable,
            Self::Auth { .. } | Self::Json(_) | Self::InvalidResponse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_is_retryable() {
        let err = GatewayError::Timeout { timeout_ms: 1_000 };
        assert!(err.is_retryable());
        assert!(err.to_string().contains("1000ms"));
    }

    #[test]
    fn api_error_carries_retryable_flag() {
        let rate_limited = GatewayError::Api {
            status: 429,
            message: "too many requests".into(),
            retryable: true,
        };
        assert!(rate_limited.is_retryable());

        let bad_request = GatewayError::Api {
            status: 400,
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!bad_request.is_retryable());
    }

    #[test]
    fn invalid_response_is_not_retryable() {
        let err = GatewayError::InvalidResponse("missing embedding field".into());
        assert!(!err.is_retryable());
    }
}
