//! Error types for remote retrieval

use thiserror::Error;

/// Classification that decides whether a failure is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The resource does not exist (HTTP 404)
    NotFound,
    /// Timeouts, connection failures and server-side errors
    Transient,
    /// The response body does not have the expected shape
    Malformed,
    /// The server refused the request (4xx other than 404, 408 and 429)
    Rejected,
}

impl ErrorKind {
    /// Only transient failures are retried
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

/// Failure reported by a transport for a single attempt
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// HTTP 404
    #[error("resource not found (HTTP 404)")]
    NotFound,

    /// The request did not complete within the transport timeout
    #[error("request timed out")]
    Timeout,

    /// The connection could not be established or was dropped
    #[error("connection failed: {0}")]
    Connection(String),

    /// Non-success HTTP status other than 404
    #[error("server returned HTTP {0}")]
    Status(u16),

    /// The body could not be read or decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Maps an HTTP status code to an error, or `None` for success codes
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            404 => Some(TransportError::NotFound),
            _ => Some(TransportError::Status(status)),
        }
    }

    /// Retry classification of this failure
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransportError::NotFound => ErrorKind::NotFound,
            TransportError::Timeout | TransportError::Connection(_) => ErrorKind::Transient,
            TransportError::Status(status) => match status {
                408 | 429 | 500..=599 => ErrorKind::Transient,
                _ => ErrorKind::Rejected,
            },
            TransportError::Malformed(_) => ErrorKind::Malformed,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if let Some(status) = err.status() {
            TransportError::from_status(status.as_u16())
                .unwrap_or_else(|| TransportError::Connection(err.to_string()))
        } else {
            TransportError::Connection(err.to_string())
        }
    }
}

/// Outcome of a logical fetch that did not produce a value
#[derive(Debug, Error)]
pub enum FetchError {
    /// The resource is absent; never retried
    #[error("{target}: resource not found")]
    NotFound { target: String },

    /// The response could not be parsed into the expected structure; never retried
    #[error("{target}: malformed response: {reason}")]
    Malformed { target: String, reason: String },

    /// The server refused the request; never retried
    #[error("{target}: request rejected")]
    Rejected {
        target: String,
        #[source]
        source: TransportError,
    },

    /// Every attempt failed with a transient error
    #[error("{target}: giving up after {attempts} attempt(s)")]
    RetryExhausted {
        target: String,
        attempts: u32,
        #[source]
        last: TransportError,
    },

    /// The session was cancelled mid-request or mid-backoff
    #[error("{target}: cancelled after {attempts} attempt(s)")]
    Cancelled { target: String, attempts: u32 },
}

impl FetchError {
    /// Builds the terminal error for a non-retryable transport failure
    pub(crate) fn terminal(target: String, err: TransportError) -> Self {
        match err {
            TransportError::NotFound => FetchError::NotFound { target },
            TransportError::Malformed(reason) => FetchError::Malformed { target, reason },
            other => FetchError::Rejected {
                target,
                source: other,
            },
        }
    }

    /// The request target this error refers to
    pub fn target(&self) -> &str {
        match self {
            FetchError::NotFound { target }
            | FetchError::Malformed { target, .. }
            | FetchError::Rejected { target, .. }
            | FetchError::RetryExhausted { target, .. }
            | FetchError::Cancelled { target, .. } => target,
        }
    }

    /// Kind of the underlying failure; `None` for cancellation
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            FetchError::NotFound { .. } => Some(ErrorKind::NotFound),
            FetchError::Malformed { .. } => Some(ErrorKind::Malformed),
            FetchError::Rejected { .. } => Some(ErrorKind::Rejected),
            FetchError::RetryExhausted { last, .. } => Some(last.kind()),
            FetchError::Cancelled { .. } => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_from_status_success_codes() {
        assert_eq!(TransportError::from_status(200), None);
        assert_eq!(TransportError::from_status(204), None);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(TransportError::from_status(404).unwrap().kind(), ErrorKind::NotFound);
        assert_eq!(TransportError::from_status(500).unwrap().kind(), ErrorKind::Transient);
        assert_eq!(TransportError::from_status(503).unwrap().kind(), ErrorKind::Transient);
        assert_eq!(TransportError::from_status(429).unwrap().kind(), ErrorKind::Transient);
        assert_eq!(TransportError::from_status(408).unwrap().kind(), ErrorKind::Transient);
        assert_eq!(TransportError::from_status(400).unwrap().kind(), ErrorKind::Rejected);
        assert_eq!(TransportError::from_status(401).unwrap().kind(), ErrorKind::Rejected);
    }

    #[test]
    fn test_only_transient_is_retryable() {
        assert!(ErrorKind::Transient.is_retryable());
        assert!(!ErrorKind::NotFound.is_retryable());
        assert!(!ErrorKind::Malformed.is_retryable());
        assert!(!ErrorKind::Rejected.is_retryable());
    }

    #[test]
    fn test_timeout_and_connection_are_transient() {
        assert_eq!(TransportError::Timeout.kind(), ErrorKind::Transient);
        assert_eq!(
            TransportError::Connection("reset".to_string()).kind(),
            ErrorKind::Transient
        );
    }

    #[test]
    fn test_terminal_maps_to_distinct_variants() {
        let not_found = FetchError::terminal("GET /posts/9".to_string(), TransportError::NotFound);
        assert!(not_found.is_not_found());
        assert_eq!(not_found.target(), "GET /posts/9");

        let malformed = FetchError::terminal(
            "GET /posts".to_string(),
            TransportError::Malformed("eof".to_string()),
        );
        assert_eq!(malformed.kind(), Some(ErrorKind::Malformed));

        let rejected = FetchError::terminal("GET /posts".to_string(), TransportError::Status(403));
        assert_eq!(rejected.kind(), Some(ErrorKind::Rejected));
    }

    #[test]
    fn test_retry_exhausted_exposes_last_error_as_source() {
        let err = FetchError::RetryExhausted {
            target: "GET /users".to_string(),
            attempts: 3,
            last: TransportError::Status(502),
        };

        assert!(err.to_string().contains("3 attempt"));
        let source = err.source().expect("should carry the last transport error");
        assert!(source.to_string().contains("502"));
        assert_eq!(err.kind(), Some(ErrorKind::Transient));
    }
}
