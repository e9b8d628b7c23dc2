//! Turn the outcome of a run into something to show the user.
//!
//! [`present`] is pure: it maps a result onto a [`Notice`] and leaves the
//! drawing to the caller (the `cvbid` binary prints it with ANSI colours).

use crate::error::AnalyserError;
use crate::output::AnalysisOutput;
use serde::Serialize;

pub const SUCCESS_HEADLINE: &str = "Analysis Complete";
pub const MISSING_UPLOAD_MESSAGE: &str = "Please upload both a CV and a Bid document.";
pub const EMPTY_INPUT_MESSAGE: &str = "One or both documents appear to be empty.";
pub const DECODE_MESSAGE: &str =
    "Error decoding model response. Please check Hugging Face token or try another model.";

/// How loudly a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

impl Severity {
    /// Process exit code for a CLI run ending with this severity.
    pub fn exit_code(&self) -> i32 {
        match self {
            Severity::Success => 0,
            Severity::Warning => 2,
            Severity::Error => 1,
        }
    }
}

/// A user-facing message: a one-line headline and an optional Markdown body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub severity: Severity,
    pub headline: String,
    pub body: String,
}

impl Notice {
    fn new(severity: Severity, headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            severity,
            headline: headline.into(),
            body: body.into(),
        }
    }
}

/// Map the outcome of a run to the notice shown to the user.
pub fn present(result: &Result<AnalysisOutput, AnalyserError>) -> Notice {
    match result {
        Ok(output) => Notice::new(
            Severity::Success,
            SUCCESS_HEADLINE,
            format!("### Result\n{}", output.analysis),
        ),
        Err(AnalyserError::MissingUpload { .. }) => {
            Notice::new(Severity::Warning, MISSING_UPLOAD_MESSAGE, "")
        }
        Err(AnalyserError::EmptyInput { .. }) => {
            Notice::new(Severity::Error, EMPTY_INPUT_MESSAGE, "")
        }
        Err(AnalyserError::Decode { detail }) => {
            Notice::new(Severity::Error, DECODE_MESSAGE, detail.as_str())
        }
        Err(AnalyserError::Extraction {
            role,
            filename,
            source,
        }) => Notice::new(
            Severity::Error,
            format!("Could not read the {role} document '{filename}'."),
            source.to_string(),
        ),
        Err(other) => Notice::new(Severity::Error, other.to_string(), ""),
    }
}
