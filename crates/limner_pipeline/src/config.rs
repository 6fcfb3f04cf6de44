//! Pipeline tunables.

use crate::prompts::DEFAULT_STYLE_TAG;
use derive_builder::Builder;

/// Tunables shared by the four stage loops.
///
/// # Examples
///
/// ```
/// use limner_pipeline::PipelineConfigBuilder;
///
/// let config = PipelineConfigBuilder::default()
///     .max_sweeps(10usize)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_sweeps, 10);
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct PipelineConfig {
    /// Style fragment prepended to every image prompt.
    #[builder(default = "DEFAULT_STYLE_TAG.to_string()")]
    pub style_tag: String,
    /// Sweep bound per stage; exhaustion reports partial completion
    /// instead of sweeping forever.
    #[builder(default = "50")]
    pub max_sweeps: usize,
    /// Pause between convergence sweeps, so polling for upstream progress
    /// does not busy-spin.
    #[builder(default = "1000")]
    pub idle_backoff_ms: u64,
    /// Extra sweeps the Audio stage runs after the Summary stage has
    /// converged, before giving up on persistently failing chunks.
    #[builder(default = "3")]
    pub audio_grace_sweeps: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfigBuilder::default()
            .build()
            .expect("default pipeline config is valid")
    }
}
