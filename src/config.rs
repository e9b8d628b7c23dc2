//! Configuration types for a CV-vs-bid analysis run.
//!
//! Every knob lives in [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. The earlier revisions of this tool disagreed on
//! the truncation limit (1500 vs. 2000 characters) and on the hosted model
//! (FLAN-T5 vs. Mistral-7B-Instruct); both are plain configuration here, with
//! [`ModelPreset`] bundling the values each revision used.

use crate::error::AnalyserError;
use crate::pipeline::llm::InferenceClient;
use crate::progress::ProgressCallback;
use crate::prompts::{BID_PLACEHOLDER, CV_PLACEHOLDER};
use crate::secrets::ApiToken;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Base URL of the hosted inference API; the model id is appended.
pub const HF_INFERENCE_BASE: &str = "https://api-inference.huggingface.co/models/";

/// Configuration for one analysis run.
///
/// # Example
/// ```rust
/// use cv_bid_analyser::{AnalysisConfig, ModelPreset};
///
/// let config = AnalysisConfig::builder()
///     .preset(ModelPreset::Mistral7BInstruct)
///     .truncation_limit(1800)
///     .build()
///     .unwrap();
/// assert_eq!(config.truncation_limit, 1800);
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// Hosted model id, e.g. `google/flan-t5-base`.
    pub model_id: String,

    /// Full endpoint URL. If None, `HF_INFERENCE_BASE + model_id`.
    pub endpoint: Option<String>,

    /// Characters of each document included in the prompt. Default: 1500.
    pub truncation_limit: usize,

    /// Sent as `parameters.max_new_tokens` when set. Default: None.
    pub max_new_tokens: Option<u32>,

    /// Instruction template the two texts are interpolated into.
    pub template: PromptTemplate,

    /// Explicit bearer token. Takes precedence over the secrets file and env.
    pub api_token: Option<ApiToken>,

    /// Secrets file to read the token from. If None, well-known paths are checked.
    pub secrets_path: Option<PathBuf>,

    /// Inference request timeout. Default: None (transport default).
    pub api_timeout_secs: Option<u64>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Pre-constructed inference client. Takes precedence over endpoint + token.
    pub client: Option<Arc<dyn InferenceClient>>,

    /// Receives stage transitions while the run progresses.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        let preset = ModelPreset::default();
        Self {
            model_id: preset.model_id().to_string(),
            endpoint: None,
            truncation_limit: preset.truncation_limit(),
            max_new_tokens: preset.max_new_tokens(),
            template: preset.template(),
            api_token: None,
            secrets_path: None,
            api_timeout_secs: None,
            download_timeout_secs: 120,
            client: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model_id", &self.model_id)
            .field("endpoint", &self.endpoint)
            .field("truncation_limit", &self.truncation_limit)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("template", &self.template)
            .field("api_token", &self.api_token)
            .field("secrets_path", &self.secrets_path)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("client", &self.client.as_ref().map(|_| "<dyn InferenceClient>"))
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

    /// The URL the inference request is POSTed to.
    pub fn endpoint_url(&self) -> String {
        match self.endpoint {
            Some(ref url) => url.clone(),
            None => format!("{}{}", HF_INFERENCE_BASE, self.model_id),
        }
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    /// Apply a preset's model, truncation limit, token budget and template.
    /// Setters called afterwards override individual values.
    pub fn preset(mut self, preset: ModelPreset) -> Self {
        self.config.model_id = preset.model_id().to_string();
        self.config.truncation_limit = preset.truncation_limit();
        self.config.max_new_tokens = preset.max_new_tokens();
        self.config.template = preset.template();
        self
    }

    pub fn model(mut self, model_id: impl Into<String>) -> Self {
        self.config.model_id = model_id.into();
        self
    }

    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.config.endpoint = Some(url.into());
        self
    }

    pub fn truncation_limit(mut self, chars: usize) -> Self {
        self.config.truncation_limit = chars;
        self
    }

    pub fn max_new_tokens(mut self, n: Option<u32>) -> Self {
        self.config.max_new_tokens = n;
        self
    }

    pub fn template(mut self, template: PromptTemplate) -> Self {
        self.config.template = template;
        self
    }

    pub fn api_token(mut self, token: ApiToken) -> Self {
        self.config.api_token = Some(token);
        self
    }

    pub fn secrets_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.secrets_path = Some(path.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = Some(secs);
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn client(mut self, client: Arc<dyn InferenceClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, AnalyserError> {
        let c = &self.config;
        if c.truncation_limit == 0 {
            return Err(AnalyserError::InvalidConfig(
                "Truncation limit must be ≥ 1 character".into(),
            ));
        }
        if c.max_new_tokens == Some(0) {
            return Err(AnalyserError::InvalidConfig(
                "max_new_tokens must be ≥ 1 when set".into(),
            ));
        }
        if c.api_timeout_secs == Some(0) {
            return Err(AnalyserError::InvalidConfig(
                "API timeout must be ≥ 1 second when set".into(),
            ));
        }
        if c.model_id.trim().is_empty() && c.endpoint.is_none() {
            return Err(AnalyserError::InvalidConfig(
                "Either a model id or an endpoint URL is required".into(),
            ));
        }
        if let Some(ref url) = c.endpoint {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(AnalyserError::InvalidConfig(format!(
                    "Endpoint must be an HTTP/HTTPS URL, got '{}'",
                    url
                )));
            }
        }
        if let PromptTemplate::Custom(ref text) = c.template {
            for placeholder in [BID_PLACEHOLDER, CV_PLACEHOLDER] {
                if !text.contains(placeholder) {
                    return Err(AnalyserError::InvalidConfig(format!(
                        "Custom prompt template must contain the {} placeholder",
                        placeholder
                    )));
                }
            }
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Model settings used by the revisions of this tool.
///
/// | Preset | Model | Limit | Template | `max_new_tokens` |
/// |--------|-------|-------|----------|------------------|
/// | `FlanT5Base` (default) | `google/flan-t5-base` | 1500 | classic | — |
/// | `Mistral7BInstruct` | `mistralai/Mistral-7B-Instruct-v0.2` | 2000 | markdown | 512 |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelPreset {
    #[default]
    FlanT5Base,
    Mistral7BInstruct,
}

impl ModelPreset {
    pub fn model_id(&self) -> &'static str {
        match self {
            ModelPreset::FlanT5Base => "google/flan-t5-base",
            ModelPreset::Mistral7BInstruct => "mistralai/Mistral-7B-Instruct-v0.2",
        }
    }

    pub fn truncation_limit(&self) -> usize {
        match self {
            ModelPreset::FlanT5Base => 1500,
            ModelPreset::Mistral7BInstruct => 2000,
        }
    }

    pub fn max_new_tokens(&self) -> Option<u32> {
        match self {
            ModelPreset::FlanT5Base => None,
            ModelPreset::Mistral7BInstruct => Some(512),
        }
    }

    pub fn template(&self) -> PromptTemplate {
        match self {
            ModelPreset::FlanT5Base => PromptTemplate::Classic,
            ModelPreset::Mistral7BInstruct => PromptTemplate::Markdown,
        }
    }
}

/// Instruction template the two document texts are interpolated into.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PromptTemplate {
    /// Match percentage, strengths, missing qualifications, suggestions.
    #[default]
    Classic,
    /// Classic items plus a request to answer in Markdown.
    Markdown,
    /// User-supplied text containing `{bid}` and `{cv}` placeholders.
    Custom(String),
}
