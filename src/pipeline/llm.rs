//! Inference: send the prompt to the hosted model and decode its answer.
//!
//! The stage is a trait, [`InferenceClient`], so the pipeline can be driven
//! by any backend. [`HuggingFaceClient`] is the production implementation;
//! tests plug in stubs that count calls or return canned bodies.
//!
//! ## Response shapes
//!
//! The hosted API does not promise one shape. A body is decoded exactly once
//! into [`InferenceResponse`]:
//!
//! ```text
//! [{"generated_text": "..."}]   → List      → first element's text
//! {"generated_text": "..."}     → Object    → its text (placeholder if absent)
//! {"error": "Model is loading"} → Object    → decode error with that message
//! anything else                 → Malformed → decode error
//! ```
//!
//! There is no retry: one request, one answer or one error.

use crate::error::AnalyserError;
use crate::secrets::ApiToken;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Returned when an object response carries no `generated_text`.
pub const NO_TEXT_PLACEHOLDER: &str = "No analysis was generated by the model.";

/// A backend able to turn a prompt into generated text.
#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Issue one request for `prompt` and return the generated text.
    async fn generate(&self, prompt: String) -> Result<String, AnalyserError>;

    /// Name shown to the user while the request runs.
    fn model_name(&self) -> String {
        "custom client".to_string()
    }
}

/// One result object as returned by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Generation {
    pub generated_text: Option<String>,
    /// Present on error bodies, e.g. while a model is still loading.
    pub error: Option<String>,
}

/// A response body, classified once at the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceResponse {
    List(Vec<Generation>),
    Object(Generation),
    Malformed(String),
}

impl InferenceResponse {
    /// Classify a raw response body. Never fails; bad input becomes `Malformed`.
    pub fn decode(body: &str) -> Self {
        match serde_json::from_str::<Value>(body) {
            Ok(Value::Array(items)) => {
                match items
                    .into_iter()
                    .map(serde_json::from_value::<Generation>)
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(list) => InferenceResponse::List(list),
                    Err(e) => InferenceResponse::Malformed(format!("unexpected list element: {e}")),
                }
            }
            Ok(obj @ Value::Object(_)) => match serde_json::from_value::<Generation>(obj) {
                Ok(g) => InferenceResponse::Object(g),
                Err(e) => InferenceResponse::Malformed(format!("unexpected object: {e}")),
            },
            Ok(other) => InferenceResponse::Malformed(format!(
                "expected a list or an object, got {}",
                json_kind(&other)
            )),
            Err(e) => InferenceResponse::Malformed(format!("body is not JSON: {e}")),
        }
    }

    /// Reduce the classified response to the generated text.
    pub fn into_text(self) -> Result<String, AnalyserError> {
        match self {
            InferenceResponse::List(items) => {
                let first = items.into_iter().next().ok_or_else(|| AnalyserError::Decode {
                    detail: "endpoint returned an empty list".into(),
                })?;
                match (first.generated_text, first.error) {
                    (Some(text), _) => Ok(text),
                    (None, Some(err)) => Err(AnalyserError::Decode {
                        detail: format!("endpoint reported: {err}"),
                    }),
                    (None, None) => Err(AnalyserError::Decode {
                        detail: "first result has no generated_text".into(),
                    }),
                }
            }
            InferenceResponse::Object(g) => match (g.generated_text, g.error) {
                (Some(text), _) => Ok(text),
                (None, Some(err)) => Err(AnalyserError::Decode {
                    detail: format!("endpoint reported: {err}"),
                }),
                (None, None) => Ok(NO_TEXT_PLACEHOLDER.to_string()),
            },
            InferenceResponse::Malformed(detail) => Err(AnalyserError::Decode { detail }),
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

// ── Wire format ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parameters: Option<GenerationParameters>,
}

#[derive(Debug, Serialize)]
struct GenerationParameters {
    max_new_tokens: u32,
}

/// The JSON body sent for `prompt`.
pub fn request_body(prompt: &str, max_new_tokens: Option<u32>) -> Value {
    let request = InferenceRequest {
        inputs: prompt,
        parameters: max_new_tokens.map(|n| GenerationParameters { max_new_tokens: n }),
    };
    serde_json::to_value(request).unwrap_or(Value::Null)
}

// ── Hugging Face client ──────────────────────────────────────────────────

/// Client for the hosted Hugging Face inference API.
///
/// The token is passed in by the caller (see [`crate::secrets::resolve_token`]);
/// the client never looks it up itself.
pub struct HuggingFaceClient {
    http: reqwest::Client,
    endpoint: String,
    token: ApiToken,
    max_new_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

impl std::fmt::Debug for HuggingFaceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceClient")
            .field("endpoint", &self.endpoint)
            .field("token", &self.token)
            .field("max_new_tokens", &self.max_new_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HuggingFaceClient {
    /// Create a client for `endpoint`.
    ///
    /// # Arguments
    /// * `endpoint`       — full model URL
    /// * `token`          — bearer credential
    /// * `max_new_tokens` — sent as `parameters.max_new_tokens` when set
    /// * `timeout_secs`   — whole-request timeout; transport default when None
    pub fn new(
        endpoint: impl Into<String>,
        token: ApiToken,
        max_new_tokens: Option<u32>,
        timeout_secs: Option<u64>,
    ) -> Result<Self, AnalyserError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| AnalyserError::Transport {
            detail: format!("could not build HTTP client: {e}"),
        })?;

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token,
            max_new_tokens,
            timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// A timeout anywhere in the exchange is `ApiTimeout`; other failures
    /// keep the error for the step that failed.
    fn request_error(&self, e: &reqwest::Error, otherwise: AnalyserError) -> AnalyserError {
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => AnalyserError::ApiTimeout { secs },
            _ => otherwise,
        }
    }
}

#[async_trait]
impl InferenceClient for HuggingFaceClient {
    async fn generate(&self, prompt: String) -> Result<String, AnalyserError> {
        let start = Instant::now();
        let body = request_body(&prompt, self.max_new_tokens);
        info!("POST {} ({} prompt chars)", self.endpoint, prompt.chars().count());

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&e, AnalyserError::Transport {
                detail: e.to_string(),
            }))?;

        let status = response.status();
        if !status.is_success() {
            warn!("Inference endpoint answered HTTP {}", status);
        }

        let text = response.text().await.map_err(|e| {
            self.request_error(&e, AnalyserError::Decode {
                detail: format!("could not read response body: {e}"),
            })
        })?;
        debug!(
            "Inference response: {} bytes in {:?}",
            text.len(),
            start.elapsed()
        );

        InferenceResponse::decode(&text).into_text()
    }

    fn model_name(&self) -> String {
        self.endpoint
            .rsplit("/models/")
            .next()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.endpoint)
            .to_string()
    }
}
