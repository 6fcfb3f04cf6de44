//! Runware-style image inference client.

use crate::classify;
use crate::retry::{DEFAULT_MAX_RETRIES, with_backoff};
use async_trait::async_trait;
use derive_builder::Builder;
use limner_core::{GenerationOutcome, ImageArtifact};
use limner_error::{ConfigError, LimnerResult};
use limner_interface::ImageGenerator;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

const DEFAULT_URL: &str = "https://api.runware.ai/v1";

/// Image client configuration.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ImageConfig {
    /// Bearer token for the endpoint.
    pub api_key: String,
    /// Inference endpoint URL.
    #[builder(default = "DEFAULT_URL.to_string()")]
    pub url: String,
    /// Model identifier.
    #[builder(default = "\"runware:101@1\".to_string()")]
    pub model: String,
    /// Classifier-free guidance scale.
    #[builder(default = "3.5")]
    pub cfg_scale: f32,
    /// Output width in pixels.
    #[builder(default = "512")]
    pub width: u32,
    /// Output height in pixels.
    #[builder(default = "512")]
    pub height: u32,
    /// Diffusion steps.
    #[builder(default = "30")]
    pub steps: u32,
    /// Scheduler name.
    #[builder(default = "\"FlowMatchEulerDiscreteScheduler\".to_string()")]
    pub scheduler: String,
    /// Output encoding requested from the provider.
    #[builder(default = "\"WEBP\".to_string()")]
    pub output_format: String,
    /// Ask the provider to flag NSFW results.
    #[builder(default = "true")]
    pub check_nsfw: bool,
    /// Ask the provider to report generation cost.
    #[builder(default = "true")]
    pub include_cost: bool,
    /// Attempts per call before the transient failure is surfaced.
    #[builder(default = "DEFAULT_MAX_RETRIES")]
    pub max_retries: usize,
    /// Per-request timeout in seconds.
    #[builder(default = "30")]
    pub timeout_secs: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageTask<'a> {
    positive_prompt: &'a str,
    model: &'a str,
    #[serde(rename = "CFGScale")]
    cfg_scale: f32,
    height: u32,
    width: u32,
    task_type: &'static str,
    #[serde(rename = "taskUUID")]
    task_uuid: String,
    output_type: &'static str,
    output_format: &'a str,
    #[serde(rename = "checkNSFW")]
    check_nsfw: bool,
    scheduler: &'a str,
    include_cost: bool,
    number_results: u32,
    steps: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    data: Vec<ImageItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageItem {
    #[serde(rename = "taskUUID")]
    task_uuid: String,
    cost: Option<f64>,
    #[serde(rename = "imageURL")]
    image_url: String,
    #[serde(rename = "NSFWContent", default)]
    nsfw_content: bool,
}

/// Runware-style image inference client.
#[derive(Debug, Clone)]
pub struct ImageClient {
    client: reqwest::Client,
    config: ImageConfig,
}

impl ImageClient {
    /// Create an image client from configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the API key is empty or the HTTP client
    /// cannot be initialized.
    pub fn new(config: ImageConfig) -> LimnerResult<Self> {
        if config.api_key.is_empty() {
            return Err(ConfigError::new("image API key not set").into());
        }
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn task<'a>(&'a self, prompt: &'a str) -> ImageTask<'a> {
        ImageTask {
            positive_prompt: prompt,
            model: &self.config.model,
            cfg_scale: self.config.cfg_scale,
            height: self.config.height,
            width: self.config.width,
            task_type: "imageInference",
            task_uuid: Uuid::new_v4().to_string(),
            output_type: "URL",
            output_format: &self.config.output_format,
            check_nsfw: self.config.check_nsfw,
            scheduler: &self.config.scheduler,
            include_cost: self.config.include_cost,
            number_results: 1,
            steps: self.config.steps,
        }
    }

    async fn attempt(&self, prompt: &str) -> GenerationOutcome<ImageArtifact> {
        // The endpoint takes a batch of tasks; we always send exactly one.
        let response = match self
            .client
            .post(&self.config.url)
            .bearer_auth(&self.config.api_key)
            .json(&[self.task(prompt)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return classify::transport_failure(&e),
        };

        let status = response.status();
        if status.is_success() {
            let parsed: ImageResponse = match response.json().await {
                Ok(parsed) => parsed,
                Err(e) => return classify::decoding_failure("image inference", e),
            };
            let Some(item) = parsed.data.into_iter().next() else {
                return classify::decoding_failure("image inference", "no images in response");
            };
            info!(
                task = %item.task_uuid,
                cost = item.cost.unwrap_or_default(),
                nsfw = item.nsfw_content,
                "image generation succeeded"
            );
            return GenerationOutcome::Success(ImageArtifact {
                url: item.image_url,
                task_id: item.task_uuid,
                cost: item.cost,
                nsfw: item.nsfw_content,
            });
        }

        let body = response.text().await.unwrap_or_default();
        classify::http_failure(status, body)
    }

    async fn fetch(&self, url: &str) -> GenerationOutcome<Vec<u8>> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => return classify::transport_failure(&e),
        };
        let status = response.status();
        if !status.is_success() {
            return classify::http_failure(status, "image download".to_string());
        }
        match response.bytes().await {
            Ok(bytes) => GenerationOutcome::Success(bytes.to_vec()),
            Err(e) => GenerationOutcome::Retryable(format!("download body failed: {}", e)),
        }
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    #[instrument(skip(self, prompt), fields(provider = "runware", model = %self.config.model))]
    async fn generate_image(&self, prompt: &str) -> GenerationOutcome<ImageArtifact> {
        with_backoff("image", self.config.max_retries, || self.attempt(prompt)).await
    }

    #[instrument(skip(self, url), fields(provider = "runware"))]
    async fn download(&self, url: &str) -> GenerationOutcome<Vec<u8>> {
        with_backoff("image-download", self.config.max_retries, || self.fetch(url)).await
    }

    fn provider_name(&self) -> &'static str {
        "runware"
    }
}
