//! Folds transport and HTTP failures into [`GenerationOutcome`] classes.

use limner_core::GenerationOutcome;
use limner_error::{RetryableError, ServiceError, ServiceErrorKind};

/// Classify a failed HTTP status into a retryable or fatal outcome.
pub(crate) fn http_failure<T>(status: reqwest::StatusCode, message: String) -> GenerationOutcome<T> {
    let err = ServiceError::new(ServiceErrorKind::Http {
        status_code: status.as_u16(),
        message,
    });
    if err.is_retryable() {
        GenerationOutcome::Retryable(err.kind.to_string())
    } else {
        GenerationOutcome::Fatal(err.kind.to_string())
    }
}

/// Classify a reqwest transport error; the whole class is transient.
pub(crate) fn transport_failure<T>(e: &reqwest::Error) -> GenerationOutcome<T> {
    let kind = if e.is_timeout() {
        ServiceErrorKind::Timeout(e.to_string())
    } else {
        ServiceErrorKind::Connection(e.to_string())
    };
    GenerationOutcome::Retryable(kind.to_string())
}

/// A 2xx response whose body could not be decoded; not worth retrying.
pub(crate) fn decoding_failure<T>(context: &str, e: impl std::fmt::Display) -> GenerationOutcome<T> {
    GenerationOutcome::Fatal(
        ServiceErrorKind::ResponseDecoding(format!("{}: {}", context, e)).to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [408u16, 429, 500, 502, 503, 504] {
            let outcome: GenerationOutcome =
                http_failure(reqwest::StatusCode::from_u16(status).unwrap(), String::new());
            assert!(outcome.is_retryable(), "{} should be retryable", status);
        }
    }

    #[test]
    fn test_client_errors_are_fatal() {
        for status in [400u16, 401, 403, 404] {
            let outcome: GenerationOutcome =
                http_failure(reqwest::StatusCode::from_u16(status).unwrap(), String::new());
            assert!(matches!(outcome, GenerationOutcome::Fatal(_)));
        }
    }
}
