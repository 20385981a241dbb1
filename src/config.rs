//! Configuration types for wine-label analysis.
//!
//! All analysis behaviour is controlled through [`AnalysisConfig`], built
//! via its [`AnalysisConfigBuilder`]. The API credential is an ordinary
//! field here: the library never reaches into the environment for it, so a
//! test can hand in a fake key or a scripted [`ModelClient`] directly.

use crate::error::WineLabelError;
use crate::pipeline::client::ModelClient;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default Anthropic model used for both passes.
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// Default Anthropic API origin (the client appends `/v1/messages`).
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Value sent in the `anthropic-version` header.
pub const DEFAULT_ANTHROPIC_VERSION: &str = "2023-06-01";

/// Configuration for a label analysis.
///
/// Built via [`AnalysisConfig::builder()`] or using
/// [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use winelabel::{AnalysisConfig, PipelineMode};
///
/// let config = AnalysisConfig::builder()
///     .api_key("sk-ant-test")
///     .max_dimension(1024)
///     .mode(PipelineMode::ExtractOnly)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_dimension, 1024);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Longest edge, in pixels, of the image sent to the model. Default: 1280.
    ///
    /// Phone photos are routinely 4000 px and up. Labels stay legible well
    /// below that, and smaller payloads keep request bodies and image-token
    /// cost down. Images already under the cap are never upscaled.
    pub max_dimension: u32,

    /// JPEG quality (1–100) used when re-encoding. Default: 82.
    pub jpeg_quality: u8,

    /// Model identifier sent with every request.
    pub model: String,

    /// Output token budget for the extraction pass. Default: 1024.
    pub extraction_max_tokens: u32,

    /// Output token budget for the enrichment pass. Default: 2048.
    pub enrichment_max_tokens: u32,

    /// Sampling temperature for both passes. Default: 0.2.
    pub temperature: f32,

    /// Provider API key for the built-in Anthropic client.
    pub api_key: Option<String>,

    /// API origin for the built-in Anthropic client.
    pub base_url: String,

    /// `anthropic-version` header value.
    pub anthropic_version: String,

    /// Whether the enrichment pass runs. Default: [`PipelineMode::TwoPass`].
    pub mode: PipelineMode,

    /// Pre-constructed model client. Takes precedence over everything else.
    pub client: Option<Arc<dyn ModelClient>>,

    /// Pre-constructed edgequake-llm provider, wrapped in a
    /// [`crate::pipeline::client::ProviderClient`].
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// edgequake-llm provider name (e.g. "openai", "gemini", "ollama").
    /// The provider reads its own credential from the environment.
    pub provider_name: Option<String>,

    /// Stage progress events, e.g. for a terminal spinner.
    pub progress_callback: Option<ProgressCallback>,

    /// Largest inbound HTTP request body accepted by the server. Default: 20 MiB.
    pub max_request_bytes: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_dimension: 1280,
            jpeg_quality: 82,
            model: DEFAULT_MODEL.to_string(),
            extraction_max_tokens: 1024,
            enrichment_max_tokens: 2048,
            temperature: 0.2,
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            anthropic_version: DEFAULT_ANTHROPIC_VERSION.to_string(),
            mode: PipelineMode::default(),
            client: None,
            provider: None,
            provider_name: None,
            progress_callback: None,
            max_request_bytes: 20 * 1024 * 1024,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("max_dimension", &self.max_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("model", &self.model)
            .field("extraction_max_tokens", &self.extraction_max_tokens)
            .field("enrichment_max_tokens", &self.enrichment_max_tokens)
            .field("temperature", &self.temperature)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("mode", &self.mode)
            .field("client", &self.client.as_ref().map(|c| c.name().to_string()))
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("provider_name", &self.provider_name)
            .field("max_request_bytes", &self.max_request_bytes)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(64);
        self
    }

    pub fn jpeg_quality(mut self, quality: u8) -> Self {
        self.config.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn extraction_max_tokens(mut self, n: u32) -> Self {
        self.config.extraction_max_tokens = n;
        self
    }

    pub fn enrichment_max_tokens(mut self, n: u32) -> Self {
        self.config.enrichment_max_tokens = n;
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 1.0);
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn anthropic_version(mut self, version: impl Into<String>) -> Self {
        self.config.anthropic_version = version.into();
        self
    }

    pub fn mode(mut self, mode: PipelineMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    pub fn max_request_bytes(mut self, n: usize) -> Self {
        self.config.max_request_bytes = n;
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing API key is not a build error: it only matters when the
    /// built-in client is actually selected, and is reported then.
    pub fn build(self) -> Result<AnalysisConfig, WineLabelError> {
        let c = &self.config;
        if c.model.trim().is_empty() {
            return Err(WineLabelError::InvalidConfig("model must not be empty".into()));
        }
        if c.extraction_max_tokens == 0 || c.enrichment_max_tokens == 0 {
            return Err(WineLabelError::InvalidConfig(
                "max tokens must be ≥ 1 for both passes".into(),
            ));
        }
        if !c.base_url.starts_with("http://") && !c.base_url.starts_with("https://") {
            return Err(WineLabelError::InvalidConfig(format!(
                "base URL must be http(s), got '{}'",
                c.base_url
            )));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which passes an analysis runs.
///
/// Both shapes share one pipeline: extraction always runs and enrichment is
/// layered on top of its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Pass A only: label-grounded fields.
    ExtractOnly,
    /// Pass A, then Pass B over its result. (default)
    #[default]
    TwoPass,
}

impl PipelineMode {
    pub fn enriches(self) -> bool {
        matches!(self, PipelineMode::TwoPass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.max_dimension, 1280);
        assert_eq!(c.jpeg_quality, 82);
        assert_eq!(c.mode, PipelineMode::TwoPass);
        assert!(c.api_key.is_none());
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn builder_clamps() {
        let c = AnalysisConfig::builder()
            .jpeg_quality(0)
            .max_dimension(3)
            .temperature(4.0)
            .build()
            .unwrap();
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.max_dimension, 64);
        assert_eq!(c.temperature, 1.0);
    }

    #[test]
    fn builder_rejects_empty_model() {
        let err = AnalysisConfig::builder().model("  ").build().unwrap_err();
        assert!(matches!(err, WineLabelError::InvalidConfig(_)));
    }

    #[test]
    fn builder_rejects_bad_base_url() {
        let err = AnalysisConfig::builder()
            .base_url("api.anthropic.com")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[test]
    fn debug_redacts_key() {
        let c = AnalysisConfig::builder().api_key("sk-ant-secret").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("sk-ant-secret"));
        assert!(dbg.contains("<redacted>"));
    }

    #[test]
    fn mode_enriches() {
        assert!(PipelineMode::TwoPass.enriches());
        assert!(!PipelineMode::ExtractOnly.enriches());
    }
}
