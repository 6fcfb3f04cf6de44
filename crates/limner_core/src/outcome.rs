//! Unified result type for heterogeneous generation providers.

/// Classified result of one generation service call.
///
/// Providers report retryable failures, permanent failures, and malformed
/// generations in vendor-specific ways; every adapter folds its encoding
/// into this one type so the stage loops share a single failure-handling
/// path.
///
/// # Examples
///
/// ```
/// use limner_core::GenerationOutcome;
///
/// let outcome: GenerationOutcome = GenerationOutcome::Success("{}".to_string());
/// assert!(outcome.is_success());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome<T = String> {
    /// The service produced a usable payload.
    Success(T),
    /// Transient failure (timeout, connection error, 5xx-class status);
    /// worth retrying with backoff.
    Retryable(String),
    /// The service produced output that failed schema validation; carries
    /// the malformed payload for the validation-repair sub-protocol.
    SchemaInvalid(String),
    /// Permanent failure for this request; do not retry.
    Fatal(String),
}

impl<T> GenerationOutcome<T> {
    /// True when the call produced a usable payload.
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }

    /// True when the failure class is transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GenerationOutcome::Retryable(_))
    }

    /// Map the success payload, leaving failure variants untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> GenerationOutcome<U> {
        match self {
            GenerationOutcome::Success(payload) => GenerationOutcome::Success(f(payload)),
            GenerationOutcome::Retryable(reason) => GenerationOutcome::Retryable(reason),
            GenerationOutcome::SchemaInvalid(raw) => GenerationOutcome::SchemaInvalid(raw),
            GenerationOutcome::Fatal(reason) => GenerationOutcome::Fatal(reason),
        }
    }
}
