//! Stage response schemas and request payloads.

use limner_core::SummaryContext;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A stage's required-field response schema.
///
/// `parse` returns `None` when the payload is not JSON or misses a required
/// field; that is the signal that kicks off the validation-repair
/// sub-protocol.
pub trait StageSchema: Sized {
    /// Stage name used in logs.
    const STAGE: &'static str;

    /// Parse and validate a raw model payload.
    fn parse(raw: &str) -> Option<Self>;
}

/// Summary stage response: narrative summary plus knowledge-base deltas.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResponse {
    /// Narrative summary of the chunk.
    pub summary: String,
    /// Updated character descriptions.
    #[serde(default)]
    pub characters: BTreeMap<String, String>,
    /// Updated place descriptions.
    #[serde(default)]
    pub places: BTreeMap<String, String>,
}

impl StageSchema for SummaryResponse {
    const STAGE: &'static str = "summary";

    fn parse(raw: &str) -> Option<Self> {
        let parsed: SummaryResponse = serde_json::from_str(raw).ok()?;
        (!parsed.summary.is_empty()).then_some(parsed)
    }
}

/// Prompt stage response: scene title plus image-generation prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
    /// Short title of the depicted scene.
    #[serde(default)]
    pub scene_title: String,
    /// Image-generation prompt.
    pub prompt: String,
}

impl StageSchema for PromptResponse {
    const STAGE: &'static str = "prompt";

    fn parse(raw: &str) -> Option<Self> {
        let parsed: PromptResponse = serde_json::from_str(raw).ok()?;
        (!parsed.prompt.is_empty()).then_some(parsed)
    }
}

/// User payload for a Summary request.
#[derive(Debug, Serialize)]
pub(crate) struct SummaryPayload<'a> {
    pub past_context: &'a str,
    pub current_chunk: &'a str,
    pub character_list: &'a BTreeMap<String, String>,
    pub places_list: &'a BTreeMap<String, String>,
}

impl<'a> SummaryPayload<'a> {
    pub fn new(chunk_text: &'a str, context: &'a SummaryContext) -> Self {
        Self {
            past_context: &context.summary,
            current_chunk: chunk_text,
            character_list: &context.characters,
            places_list: &context.places,
        }
    }
}

/// User payload for a Prompt request.
#[derive(Debug, Serialize)]
pub(crate) struct PromptPayload<'a> {
    pub input_text: &'a str,
    pub character_list: &'a BTreeMap<String, String>,
    pub places_list: &'a BTreeMap<String, String>,
}
