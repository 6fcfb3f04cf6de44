//! Text-to-speech client (Google-style synthesize endpoint).

use crate::classify;
use crate::retry::{DEFAULT_MAX_RETRIES, with_backoff};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use derive_builder::Builder;
use limner_core::GenerationOutcome;
use limner_error::{ConfigError, LimnerResult};
use limner_interface::SpeechSynthesizer;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

const DEFAULT_URL: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Speech client configuration.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct SpeechConfig {
    /// API key passed as a query parameter.
    pub api_key: String,
    /// Synthesize endpoint URL.
    #[builder(default = "DEFAULT_URL.to_string()")]
    pub url: String,
    /// BCP-47 language code.
    #[builder(default = "\"en-GB\".to_string()")]
    pub language_code: String,
    /// Voice name within the language.
    #[builder(default = "\"en-GB-Wavenet-B\".to_string()")]
    pub voice: String,
    /// Requested audio encoding.
    #[builder(default = "\"MP3\".to_string()")]
    pub audio_encoding: String,
    /// Attempts per call before the transient failure is surfaced.
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    pub max_retries: usize,
    /// Per-request timeout in seconds.
    #[builder(default = "30")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    #[serde(rename = "audioConfig")]
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct VoiceSelection<'a> {
    #[serde(rename = "languageCode")]
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct AudioConfig<'a> {
    #[serde(rename = "audioEncoding")]
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
struct SynthesizeResponse {
    #[serde(rename = "audioContent")]
    audio_content: String,
}

/// Text-to-speech client.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechClient {
    /// Create a speech client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the API key is empty or the HTTP client
    /// cannot be initialized.
    pub fn new(config: SpeechConfig) -> LimnerResult<Self> {
        if config.api_key.is_empty() {
            return Err(ConfigError::new("speech API key not set").into());
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    async fn attempt(&self, text: &str) -> GenerationOutcome<Vec<u8>> {
        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.config.language_code,
                name: &self.config.voice,
            },
            audio_config: AudioConfig {
                audio_encoding: &self.config.audio_encoding,
            },
        };

        let response = match self
            .client
            .post(&self.config.url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify::transport_failure(&e),
        };

        let status = response.status();
        if status.is_success() {
            let parsed: SynthesizeResponse = match response.json().await {
                Ok(parsed) => parsed,
                Err(e) => return classify::decoding_failure("speech synthesis", e),
            };
            return match STANDARD.decode(parsed.audio_content) {
                Ok(bytes) => {
                    info!(bytes = bytes.len(), "speech synthesis succeeded");
                    GenerationOutcome::Success(bytes)
                }
                Err(e) => classify::decoding_failure("audio payload", e),
            };
        }

        let body = response.text().await.unwrap_or_default();
        classify::http_failure(status, body)
    }
}

#[async_trait]
impl SpeechSynthesizer for SpeechClient {
    #[instrument(skip(self, text), fields(provider = "google-tts", voice = %self.config.voice, text_len = text.len()))]
    async fn synthesize(&self, text: &str) -> GenerationOutcome<Vec<u8>> {
        with_backoff("speech", self.config.max_retries, || self.attempt(text)).await
    }

    fn provider_name(&self) -> &'static str {
        "google-tts"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = SynthesizeRequest {
            input: SynthesisInput { text: "hello" },
            voice: VoiceSelection {
                language_code: "en-GB",
                name: "en-GB-Wavenet-B",
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["input"]["text"], "hello");
        assert_eq!(value["voice"]["languageCode"], "en-GB");
        assert_eq!(value["audioConfig"]["audioEncoding"], "MP3");
    }

    #[test]
    fn test_audio_content_decodes() {
        let body = format!(r#"{{"audioContent":"{}"}}"#, STANDARD.encode(b"mp3!"));
        let parsed: SynthesizeResponse = serde_json::from_str(&body).unwrap();
        assert_eq!(STANDARD.decode(parsed.audio_content).unwrap(), b"mp3!");
    }
}
