//! OpenAI-compatible chat completions client (Groq endpoint).
//!
//! Used by both the Summary and Prompt stages. The provider is asked for
//! strict JSON output (`response_format: json_object`); when its own
//! validation rejects a generation it returns a `json_validate_failed`
//! error carrying the malformed payload, which this client surfaces as
//! [`GenerationOutcome::SchemaInvalid`] for the repair sub-protocol.

use crate::classify;
use crate::retry::{DEFAULT_MAX_RETRIES, with_backoff};
use async_trait::async_trait;
use derive_builder::Builder;
use limner_core::{ChatRequest, GenerationOutcome, TokenUsage};
use limner_error::{ConfigError, LimnerResult};
use limner_interface::TextGenerator;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

const DEFAULT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Chat client configuration.
///
/// Payload tuning defaults follow the values the pipeline was calibrated
/// with: moderate temperature, strong repetition penalties, JSON-object
/// response format.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ChatConfig {
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Chat completions endpoint URL.
    #[builder(default = "DEFAULT_URL.to_string()")]
    pub url: String,
    /// Model identifier.
    #[builder(default = "\"llama-3.1-8b-instant\".to_string()")]
    pub model: String,
    /// Sampling temperature.
    #[builder(default = "0.4")]
    pub temperature: f32,
    /// Nucleus sampling bound.
    #[builder(default = "0.8")]
    pub top_p: f32,
    /// Frequency penalty.
    #[builder(default = "1.0")]
    pub frequency_penalty: f32,
    /// Presence penalty.
    #[builder(default = "1.5")]
    pub presence_penalty: f32,
    /// Completion token budget.
    #[builder(default = "2048")]
    pub max_completion_tokens: u32,
    /// Attempts per call before the transient failure is surfaced.
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    pub max_retries: usize,
    /// Per-request timeout in seconds.
    #[builder(default = "10")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatPayload<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
    max_completion_tokens: u32,
    response_format: ResponseFormat,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    code: Option<String>,
    message: Option<String>,
    failed_generation: Option<String>,
}

/// OpenAI-compatible chat completions client.
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    config: ChatConfig,
}

impl ChatClient {
    /// Create a chat client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the API key is empty or the HTTP client
    /// cannot be initialized; both abort the pipeline before any stage
    /// starts.
    pub fn new(config: ChatConfig) -> LimnerResult<Self> {
        if config.api_key.is_empty() {
            return Err(ConfigError::new("chat API key not set").into());
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn payload<'a>(&'a self, req: &'a ChatRequest) -> ChatPayload<'a> {
        ChatPayload {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &req.system,
                },
                ChatMessage {
                    role: "user",
                    content: &req.user,
                },
            ],
            temperature: self.config.temperature,
            stream: false,
            max_completion_tokens: self.config.max_completion_tokens,
            response_format: ResponseFormat { kind: "json_object" },
            top_p: self.config.top_p,
            frequency_penalty: self.config.frequency_penalty,
            presence_penalty: self.config.presence_penalty,
        }
    }

    async fn attempt(&self, req: &ChatRequest) -> GenerationOutcome<String> {
        let response = match self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&self.payload(req))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify::transport_failure(&e),
        };

        let status = response.status();
        if status.is_success() {
            let completion: ChatCompletion = match response.json().await {
                Ok(completion) => completion,
                Err(e) => return classify::decoding_failure("chat completion", e),
            };
            let Some(choice) = completion.choices.into_iter().next() else {
                return classify::decoding_failure("chat completion", "no choices in response");
            };
            if let Some(usage) = completion.usage {
                let usage = TokenUsage::new(usage.prompt_tokens, usage.completion_tokens);
                info!(
                    prompt_tokens = usage.prompt_tokens(),
                    completion_tokens = usage.completion_tokens(),
                    "chat completion succeeded"
                );
            }
            return GenerationOutcome::Success(choice.message.content);
        }

        let body = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<ApiErrorEnvelope>(&body) {
            if envelope.error.code.as_deref() == Some("json_validate_failed") {
                if let Some(raw) = envelope.error.failed_generation {
                    debug!("provider rejected its own generation, raw payload captured");
                    return GenerationOutcome::SchemaInvalid(raw);
                }
            }
            return classify::http_failure(status, envelope.error.message.unwrap_or_default());
        }
        classify::http_failure(status, body)
    }
}

#[async_trait]
impl TextGenerator for ChatClient {
    #[instrument(skip(self, req), fields(provider = "groq", model = %self.config.model))]
    async fn generate(&self, req: &ChatRequest) -> GenerationOutcome<String> {
        with_backoff("chat", self.config.max_retries, || self.attempt(req)).await
    }

    fn provider_name(&self) -> &'static str {
        "groq"
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = ChatConfigBuilder::default()
            .api_key("k")
            .build()
            .unwrap();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_payload_shape() {
        let config = ChatConfigBuilder::default()
            .api_key("k")
            .build()
            .unwrap();
        let client = ChatClient::new(config).unwrap();
        let req = ChatRequest {
            system: "role".to_string(),
            user: "{}".to_string(),
        };

        let value = serde_json::to_value(client.payload(&req)).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["role"], "user");
        assert_eq!(value["stream"], false);
        assert_eq!(value["top_p"], 0.8);
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let config = ChatConfigBuilder::default()
            .api_key("")
            .build()
            .unwrap();
        assert!(ChatClient::new(config).is_err());
    }

    #[test]
    fn test_failed_generation_envelope_parses() {
        let body = r#"{"error":{"code":"json_validate_failed","message":"bad","failed_generation":"{\"summary\": oops"}}"#;
        let envelope: ApiErrorEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(envelope.error.code.as_deref(), Some("json_validate_failed"));
        assert!(envelope.error.failed_generation.is_some());
    }
}
