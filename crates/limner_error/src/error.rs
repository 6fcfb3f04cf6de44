//! Top-level error wrapper types.

use crate::{ChunkerError, ConfigError, JsonError, PipelineError, ServiceError, StorageError};

/// This is the foundation error enum covering every Limner crate.
///
/// # Examples
///
/// ```
/// use limner_error::{LimnerError, ChunkerError};
///
/// let chunker_err = ChunkerError::new("tokenizer unavailable");
/// let err: LimnerError = chunker_err.into();
/// assert!(format!("{}", err).contains("Chunker Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum LimnerErrorKind {
    /// Generation service error
    #[from(ServiceError)]
    Service(ServiceError),
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Chunker error
    #[from(ChunkerError)]
    Chunker(ChunkerError),
    /// Storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Pipeline error
    #[from(PipelineError)]
    Pipeline(PipelineError),
}

/// Limner error with kind discrimination.
///
/// # Examples
///
/// ```
/// use limner_error::{LimnerResult, ConfigError};
///
/// fn might_fail() -> LimnerResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Limner Error: {}", _0)]
pub struct LimnerError(Box<LimnerErrorKind>);

impl LimnerError {
    /// Create a new error from a kind.
    pub fn new(kind: LimnerErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &LimnerErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to LimnerErrorKind
impl<T> From<T> for LimnerError
where
    T: Into<LimnerErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Limner operations.
///
/// # Examples
///
/// ```
/// use limner_error::{LimnerResult, ChunkerError};
///
/// fn tokenize() -> LimnerResult<Vec<usize>> {
///     Err(ChunkerError::new("model not loaded"))?
/// }
/// ```
pub type LimnerResult<T> = std::result::Result<T, LimnerError>;
