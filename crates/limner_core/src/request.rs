//! Request and response types shared by the generation service contracts.

use serde::{Deserialize, Serialize};

/// A chat-style generation request: system role plus a JSON user payload.
///
/// # Examples
///
/// ```
/// use limner_core::ChatRequest;
///
/// let request = ChatRequest {
///     system: "You are a book parser.".to_string(),
///     user: r#"{"current_chunk":"..."}"#.to_string(),
/// };
/// assert!(request.user.starts_with('{'));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    /// System role text steering the generation.
    pub system: String,
    /// User payload, serialized JSON.
    pub user: String,
}

/// Result of a successful image generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Where the provider hosts the generated image.
    pub url: String,
    /// Provider-side task identifier.
    pub task_id: String,
    /// Generation cost in USD, when the provider reports it.
    pub cost: Option<f64>,
    /// Provider's NSFW classification of the result.
    pub nsfw: bool,
}
