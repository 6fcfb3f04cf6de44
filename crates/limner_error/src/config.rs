//! Configuration error types.

/// Configuration error with source location.
///
/// Raised for missing credentials or endpoints at startup; aborts the
/// pipeline before any stage starts.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Config Error: {} at line {} in {}", message, line, file)]
pub struct ConfigError {
    /// The underlying error message
    pub message: String,
    /// Line number where the error occurred
    pub line: u32,
    /// File where the error occurred
    pub file: &'static str,
}

impl ConfigError {
    /// Create a new ConfigError with the given message at the current location.
    ///
    /// # Examples
    ///
    /// ```
    /// use limner_error::ConfigError;
    ///
    /// let err = ConfigError::new("RUNWARE_API_KEY not set");
    /// assert!(err.message.contains("RUNWARE_API_KEY"));
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
