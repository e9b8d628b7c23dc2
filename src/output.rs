//! Result types returned by a successful analysis.

use serde::{Deserialize, Serialize};

/// Everything a successful run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutput {
    /// Cleaned model answer, ready to render as Markdown.
    pub analysis: String,
    /// The text exactly as decoded from the endpoint.
    pub raw_response: String,
    /// Model (or client) that produced the answer.
    pub model: String,
    pub stats: AnalysisStats,
}

/// Sizes and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStats {
    /// Characters extracted from the CV.
    pub cv_chars: usize,
    /// Characters extracted from the bid / job description.
    pub bid_chars: usize,
    /// Truncation limit applied to each text.
    pub truncation_limit: usize,
    /// Characters in the prompt actually sent.
    pub prompt_chars: usize,
    pub extraction_duration_ms: u64,
    pub inference_duration_ms: u64,
    pub total_duration_ms: u64,
}

impl AnalysisStats {
    /// Whether either document was cut to fit the truncation limit.
    pub fn truncated(&self) -> bool {
        self.cv_chars > self.truncation_limit || self.bid_chars > self.truncation_limit
    }
}
