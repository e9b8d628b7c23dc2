//! Error types for the cv-bid-analyser library.
//!
//! Two error types reflect two layers of failure:
//!
//! * [`AnalyserError`] — **Terminal**: the run stops and the condition is
//!   shown to the user (missing document, empty text, undecodable model
//!   response, …). Returned as `Err(AnalyserError)` from the `analyze*`
//!   entry points and turned into a user-facing notice by
//!   [`crate::present::present`].
//!
//! * [`ExtractionError`] — a document parser rejected its input. It never
//!   escapes on its own; the pipeline wraps it in
//!   [`AnalyserError::Extraction`] together with the document role and
//!   filename so the message can say *which* upload was unreadable.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which of the two uploads a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// The candidate's CV / résumé.
    Candidate,
    /// The bid or job description the CV is compared against.
    Comparison,
}

impl DocumentRole {
    /// Short human label used in messages ("CV", "Bid").
    pub fn label(&self) -> &'static str {
        match self {
            DocumentRole::Candidate => "CV",
            DocumentRole::Comparison => "Bid",
        }
    }
}

impl fmt::Display for DocumentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

fn join_roles(roles: &[DocumentRole]) -> String {
    roles
        .iter()
        .map(DocumentRole::label)
        .collect::<Vec<_>>()
        .join(" and ")
}

/// All terminal errors returned by the cv-bid-analyser library.
#[derive(Debug, Error)]
pub enum AnalyserError {
    // ── Validation ────────────────────────────────────────────────────────
    /// The run was triggered without both documents.
    #[error("Missing upload: {} document not provided", join_roles(.missing))]
    MissingUpload { missing: Vec<DocumentRole> },

    /// Extraction succeeded but produced only whitespace.
    #[error("No text could be extracted from the {} document", join_roles(.empty))]
    EmptyInput { empty: Vec<DocumentRole> },

    // ── Input errors ──────────────────────────────────────────────────────
    /// Local document path does not exist.
    #[error("Document not found: '{path}'\nCheck the path exists and is readable.")]
    DocumentNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// A document parser rejected the uploaded bytes.
    #[error("Could not read the {role} document '{filename}': {source}")]
    Extraction {
        role: DocumentRole,
        filename: String,
        #[source]
        source: ExtractionError,
    },

    // ── Inference errors ──────────────────────────────────────────────────
    /// No bearer token could be found.
    #[error("Hugging Face token is not configured.\n{hint}")]
    CredentialMissing { hint: String },

    /// The secrets file exists but could not be read or parsed.
    #[error("Invalid secrets file '{path}': {detail}")]
    SecretsFile { path: PathBuf, detail: String },

    /// The request never produced a response (DNS, TLS, connection reset…).
    #[error("Inference request failed: {detail}")]
    Transport { detail: String },

    /// The inference call exceeded `api_timeout_secs`.
    #[error("Inference request timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The endpoint answered, but not with generated text we can use.
    #[error("Could not decode model response: {detail}")]
    Decode { detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A parser-level failure for one document.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
pub enum ExtractionError {
    /// The PDF could not be loaded (corrupt, truncated, unsupported encryption).
    #[error("PDF parsing failed: {detail}")]
    Pdf { detail: String },

    /// The DOCX archive or its document XML could not be read.
    #[error("DOCX parsing failed: {detail}")]
    Docx { detail: String },

    /// The parser panicked on malformed input.
    #[error("parser aborted on malformed input: {detail}")]
    ParserPanicked { detail: String },
}
