//! Shared stage-loop plumbing: upstream gates and reporting.

use limner_core::Book;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Signals that an upstream stage worker has exited.
///
/// A downstream stage waiting on chunks that are not yet eligible cannot
/// tell "upstream is still working" from "upstream gave up"; the gate
/// resolves that. While the gate is closed, empty sweeps just wait; once
/// it opens, an empty sweep means no chunk will ever become eligible and
/// the stage exits with partial completion. Callers must eventually open
/// every gate they hand out, or the waiting stage will not terminate.
#[derive(Debug, Clone, Default)]
pub struct StageGate(Arc<AtomicBool>);

impl StageGate {
    /// Create a gate that is already open (no upstream writer exists).
    pub fn opened() -> Self {
        let gate = Self::default();
        gate.open();
        gate
    }

    /// Mark the upstream writer as finished.
    pub fn open(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether the upstream writer has finished.
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// What one sweep over the book actually did.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SweepTally {
    /// Eligible chunks the sweep tried to fill.
    pub attempted: usize,
    /// Chunks whose field was set this sweep.
    pub resolved: usize,
}

/// Outcome of one stage loop over a book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    /// Stage name.
    pub stage: &'static str,
    /// Sweeps performed.
    pub sweeps: usize,
    /// Chunks whose stage field is set at exit.
    pub completed: usize,
    /// Chunks still missing the stage's field at exit.
    pub unresolved: usize,
    /// Whether the stage's convergence predicate held at exit.
    pub converged: bool,
}

impl StageReport {
    pub(crate) fn finish(
        stage: &'static str,
        book: &Book,
        sweeps: usize,
        field_set: impl Fn(&limner_core::Chunk) -> bool,
    ) -> Self {
        let completed = book.chunks().filter(|&c| field_set(c)).count();
        let unresolved = book.chunk_count() - completed;
        let converged = unresolved == 0;
        if converged {
            info!(stage, sweeps, completed, "stage converged");
        } else {
            warn!(
                stage,
                sweeps, completed, unresolved, "stage exited without converging"
            );
        }
        Self {
            stage,
            sweeps,
            completed,
            unresolved,
            converged,
        }
    }
}
