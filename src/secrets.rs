//! Bearer-token resolution for the inference endpoint.
//!
//! The token is read once at startup and handed to
//! [`crate::pipeline::llm::HuggingFaceClient::new`] as a plain value; nothing
//! in the crate reads credentials from global state after that, so tests can
//! pass any fake token they like.
//!
//! Lookup order used by [`resolve_token`]:
//!
//! 1. an explicit token (CLI `--token` or [`crate::AnalysisConfigBuilder::api_token`])
//! 2. a TOML secrets file with a `[huggingface]` table
//! 3. the `HF_TOKEN` / `HUGGINGFACE_TOKEN` environment variables

use crate::error::AnalyserError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables consulted, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["HF_TOKEN", "HUGGINGFACE_TOKEN"];

/// Secrets files checked when no explicit path is configured.
pub const DEFAULT_SECRETS_PATHS: [&str; 2] = ["secrets.toml", ".streamlit/secrets.toml"];

/// A bearer credential. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiToken(String);

impl ApiToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into().trim().to_string())
    }

    /// The raw token, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiToken(<redacted>)")
    }
}

#[derive(Debug, Deserialize)]
struct SecretsFile {
    huggingface: Option<HuggingFaceSecrets>,
}

#[derive(Debug, Deserialize)]
struct HuggingFaceSecrets {
    token: Option<String>,
}

/// Parse the `[huggingface] token` entry out of a secrets document.
///
/// Returns `Ok(None)` when the table or key is absent.
pub fn parse_secrets(contents: &str) -> Result<Option<ApiToken>, toml::de::Error> {
    let parsed: SecretsFile = toml::from_str(contents)?;
    Ok(parsed
        .huggingface
        .and_then(|hf| hf.token)
        .map(ApiToken::new)
        .filter(|t| !t.is_empty()))
}

/// Read a token from a secrets file on disk.
pub async fn load_secrets_file(path: &Path) -> Result<Option<ApiToken>, AnalyserError> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| AnalyserError::SecretsFile {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    parse_secrets(&contents).map_err(|e| AnalyserError::SecretsFile {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Resolve the token from the configured sources.
///
/// An explicitly configured `secrets_path` must exist; the default paths
/// are only used when present.
pub async fn resolve_token(
    explicit: Option<&ApiToken>,
    secrets_path: Option<&Path>,
) -> Result<ApiToken, AnalyserError> {
    if let Some(token) = explicit.filter(|t| !t.is_empty()) {
        debug!("Using explicitly configured token");
        return Ok(token.clone());
    }

    let mut candidates: Vec<PathBuf> = Vec::new();
    match secrets_path {
        Some(p) => candidates.push(p.to_path_buf()),
        None => {
            for default in DEFAULT_SECRETS_PATHS {
                let path = PathBuf::from(default);
                if is_file(&path).await {
                    candidates.push(path);
                }
            }
        }
    }
    for path in &candidates {
        if let Some(token) = load_secrets_file(path).await? {
            debug!("Using token from {}", path.display());
            return Ok(token);
        }
    }

    for var in TOKEN_ENV_VARS {
        if let Ok(value) = std::env::var(var) {
            let token = ApiToken::new(value);
            if !token.is_empty() {
                debug!("Using token from ${}", var);
                return Ok(token);
            }
        }
    }

    Err(AnalyserError::CredentialMissing {
        hint: format!(
            "Pass --token, add a [huggingface] token entry to secrets.toml, \
             or set {}.",
            TOKEN_ENV_VARS.join(" / ")
        ),
    })
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}
