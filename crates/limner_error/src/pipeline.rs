//! Pipeline error types.

/// Pipeline-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PipelineErrorKind {
    /// A stage worker panicked or was cancelled
    #[display("Stage worker failed: {}", _0)]
    WorkerFailed(String),
    /// A monotonic write was rejected
    #[display("Rejected write: {}", _0)]
    RejectedWrite(String),
}

/// Pipeline error with source location tracking.
///
/// # Examples
///
/// ```
/// use limner_error::{PipelineError, PipelineErrorKind};
///
/// let err = PipelineError::new(PipelineErrorKind::WorkerFailed("join error".to_string()));
/// assert!(format!("{}", err).contains("join error"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Pipeline Error: {} at line {} in {}", kind, line, file)]
pub struct PipelineError {
    /// The kind of error that occurred
    pub kind: PipelineErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PipelineError {
    /// Create a new PipelineError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PipelineErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
