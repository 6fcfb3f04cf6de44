//! Storage error types for recovery state and media persistence.

/// Storage-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum StorageErrorKind {
    /// Failed to create a directory
    #[display("Directory creation failed: {}", _0)]
    DirectoryCreation(String),
    /// Failed to write a file
    #[display("File write failed: {}", _0)]
    FileWrite(String),
    /// Failed to read a file
    #[display("File read failed: {}", _0)]
    FileRead(String),
    /// Referenced content does not exist
    #[display("Not found: {}", _0)]
    NotFound(String),
    /// Stored content failed hash verification
    #[display("Hash mismatch: {}", _0)]
    HashMismatch(String),
    /// State record could not be serialized or deserialized
    #[display("State encoding failed: {}", _0)]
    StateEncoding(String),
}

/// Storage error with source location tracking.
///
/// # Examples
///
/// ```
/// use limner_error::{StorageError, StorageErrorKind};
///
/// let err = StorageError::new(StorageErrorKind::NotFound("0001_0002.json".to_string()));
/// assert!(format!("{}", err).contains("0001_0002.json"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Storage Error: {} at line {} in {}", kind, line, file)]
pub struct StorageError {
    /// The kind of error that occurred
    pub kind: StorageErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl StorageError {
    /// Create a new StorageError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: StorageErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
