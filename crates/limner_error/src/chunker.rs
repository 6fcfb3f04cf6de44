//! Chunker error types.

/// Chunker error wrapping tokenizer failures with source location.
///
/// Tokenizer unavailability is fatal for the whole book: no partial
/// chunking is ever produced.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Chunker Error: {} at line {} in {}", message, line, file)]
pub struct ChunkerError {
    /// The underlying error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ChunkerError {
    /// Create a new ChunkerError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use limner_error::ChunkerError;
    ///
    /// let err = ChunkerError::new("tokenizer unavailable");
    /// assert!(err.message.contains("tokenizer"));
    /// ```
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: location.line(),
            file: location.file(),
        }
    }
}
