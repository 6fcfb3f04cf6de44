//! The validation-repair sub-protocol.
//!
//! When a generation fails schema validation — locally, or flagged by the
//! provider itself — the same service is asked to reformat its previous
//! output into the required schema. The loop is strictly bounded: each
//! round feeds back the latest malformed payload, and after
//! [`MAX_VALIDATION_ERROR_TRY`] unresolved rounds the chunk is abandoned
//! for the current sweep.

use crate::schema::StageSchema;
use limner_core::{ChatRequest, GenerationOutcome};
use limner_interface::TextGenerator;
use tracing::{error, info, warn};

/// Repair attempts per malformed generation before the chunk is abandoned
/// for the current sweep.
pub const MAX_VALIDATION_ERROR_TRY: usize = 3;

/// Ask `client` to reformat `malformed` into schema `T`.
///
/// Returns `None` when the bound is exhausted; the caller abandons the
/// chunk for this sweep.
pub async fn repair<T: StageSchema>(
    client: &dyn TextGenerator,
    repair_role: &str,
    malformed: String,
) -> Option<T> {
    let mut payload = malformed;
    for attempt in 1..=MAX_VALIDATION_ERROR_TRY {
        let request = ChatRequest {
            system: repair_role.to_string(),
            user: payload.clone(),
        };
        match client.generate(&request).await {
            GenerationOutcome::Success(raw) => {
                if let Some(parsed) = T::parse(&raw) {
                    info!(stage = T::STAGE, attempt, "validation error resolved");
                    return Some(parsed);
                }
                payload = raw;
            }
            GenerationOutcome::SchemaInvalid(raw) => {
                payload = raw;
            }
            GenerationOutcome::Retryable(reason) | GenerationOutcome::Fatal(reason) => {
                warn!(stage = T::STAGE, attempt, reason = %reason, "repair request failed");
            }
        }
        warn!(stage = T::STAGE, attempt, "validation unresolved");
    }
    error!(
        stage = T::STAGE,
        "could not repair generation, abandoning chunk for this sweep"
    );
    None
}
