//! Configuration for report analysis.
//!
//! Every knob lives in [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping the whole surface in one struct makes
//! it trivial to share a config across concurrent invocations, log it, and
//! diff two runs to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A dozen-field constructor is unreadable and breaks on every new field.
//! The builder lets callers set only what they care about and rely on
//! documented defaults for the rest.

use crate::error::ReportError;
use crate::provider::LlmProvider;
use std::fmt;
use std::sync::Arc;

/// Configuration for one or many pipeline invocations.
///
/// Built via [`AnalysisConfig::builder()`] or [`AnalysisConfig::default()`].
///
/// # Example
/// ```rust
/// use forecourt_report::AnalysisConfig;
///
/// let config = AnalysisConfig::builder()
///     .model("gpt-4o-mini")
///     .temperature(0.1)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier, e.g. "gpt-4o-mini", "claude-3-5-haiku-latest".
    /// If None, the provider default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic").
    /// If None along with `provider`, the provider is auto-detected from
    /// environment API keys.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    /// This is the injection point for tests and custom middleware.
    pub provider: Option<Arc<dyn LlmProvider>>,

    /// Sampling temperature for the completion. Default: 0.1.
    ///
    /// Low temperature keeps the model faithful to what is printed on the
    /// report. The call is still inherently non-deterministic — nothing
    /// downstream may assume byte-identical output across runs.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    ///
    /// A full report record with forecast and notes fits comfortably in
    /// 2 000 output tokens; 4 096 leaves headroom without letting a confused
    /// model ramble at cost.
    pub max_tokens: u32,

    /// Custom extraction instruction. If None, the built-in contract in
    /// [`crate::prompts`] is used. Overriding this voids the normalizer's
    /// assumptions — do it only in experiments.
    pub system_prompt: Option<String>,

    /// Send the original PDF bytes base64-encoded instead of extracted text.
    /// Default: false.
    ///
    /// Binary mode preserves table layout for providers that read PDFs
    /// natively (Anthropic). Text mode is cheaper and works everywhere.
    pub binary_mode: bool,

    /// Ceiling on extracted text length in characters. Default: 200 000.
    ///
    /// Bounds downstream prompt size. Truncation is silent — a monthly
    /// report that long has its figures in the first pages anyway.
    pub max_text_chars: usize,

    /// Maximum accepted upload size in bytes. Default: 20 MB.
    pub max_upload_bytes: usize,

    /// Per-LLM-call timeout in seconds. Default: 120.
    ///
    /// The original system had no timeout on the completion call, which let
    /// one hung request pin an invocation forever. A production pipeline
    /// always bounds its slowest external call.
    pub api_timeout_secs: u64,

    /// Key prefix for automatic latest-report selection in the bucket.
    /// Default: "reports".
    pub bucket_prefix: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            system_prompt: None,
            binary_mode: false,
            max_text_chars: 200_000,
            max_upload_bytes: 20 * 1024 * 1024,
            api_timeout_secs: 120,
            bucket_prefix: "reports".to_string(),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LlmProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("binary_mode", &self.binary_mode)
            .field("max_text_chars", &self.max_text_chars)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("bucket_prefix", &self.bucket_prefix)
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
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n.max(1);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn binary_mode(mut self, v: bool) -> Self {
        self.config.binary_mode = v;
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn max_upload_bytes(mut self, n: usize) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn bucket_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.bucket_prefix = prefix.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, ReportError> {
        let c = &self.config;
        if c.max_text_chars < 1_000 {
            return Err(ReportError::InvalidConfig(format!(
                "max_text_chars must be ≥ 1000, got {}",
                c.max_text_chars
            )));
        }
        if c.max_upload_bytes == 0 {
            return Err(ReportError::InvalidConfig(
                "max_upload_bytes must be ≥ 1".into(),
            ));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReportError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
