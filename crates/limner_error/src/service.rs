//! Generation service error types and retry classification.

/// Generation service error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum ServiceErrorKind {
    /// Connection-level failure before any response arrived
    #[display("Connection failed: {}", _0)]
    Connection(String),
    /// Request timed out
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    Http {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Response body could not be decoded
    #[display("Response decoding failed: {}", _0)]
    ResponseDecoding(String),
    /// Retry budget exhausted without a usable response
    #[display("Retries exhausted after {} attempts", _0)]
    RetriesExhausted(usize),
}

impl ServiceErrorKind {
    /// Check if this error type should be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            ServiceErrorKind::Http { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            ServiceErrorKind::Connection(_) => true,
            ServiceErrorKind::Timeout(_) => true,
            _ => false,
        }
    }
}

/// Service error with source location tracking.
///
/// # Examples
///
/// ```
/// use limner_error::{ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::new(ServiceErrorKind::Http {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
/// assert!(format!("{}", err).contains("503"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Service Error: {} at line {} in {}", kind, line, file)]
pub struct ServiceError {
    /// The kind of error that occurred
    pub kind: ServiceErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl ServiceError {
    /// Create a new ServiceError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: ServiceErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// This trait allows error types to specify whether they should trigger a
/// retry with exponential backoff, or fail immediately.
///
/// # Examples
///
/// ```
/// use limner_error::{RetryableError, ServiceError, ServiceErrorKind};
///
/// let err = ServiceError::new(ServiceErrorKind::Timeout("10s elapsed".to_string()));
/// assert!(err.is_retryable());
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    ///
    /// Transient errors like 503 (service unavailable), 429 (rate limit),
    /// or network timeouts should return true. Permanent errors like 401
    /// (unauthorized) or 400 (bad request) should return false.
    fn is_retryable(&self) -> bool;
}

impl RetryableError for ServiceError {
    fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_status_codes_retryable() {
        for status in [408, 429, 500, 502, 503, 504] {
            let kind = ServiceErrorKind::Http {
                status_code: status,
                message: String::new(),
            };
            assert!(kind.is_retryable(), "{} should be retryable", status);
        }
    }

    #[test]
    fn test_client_errors_not_retryable() {
        for status in [400, 401, 403, 404, 422] {
            let kind = ServiceErrorKind::Http {
                status_code: status,
                message: String::new(),
            };
            assert!(!kind.is_retryable(), "{} should not be retryable", status);
        }
    }

    #[test]
    fn test_decoding_failure_not_retryable() {
        assert!(!ServiceErrorKind::ResponseDecoding("truncated body".to_string()).is_retryable());
        assert!(!ServiceErrorKind::RetriesExhausted(3).is_retryable());
    }
}
