//! Progress-callback trait for analysis stage events.
//!
//! Inject an [`Arc<dyn AnalysisProgressCallback>`] via
//! [`crate::config::AnalysisConfigBuilder::progress_callback`] to follow a run
//! as it moves through the pipeline. The CLI uses it to drive a spinner; a
//! host application could forward the events to a log or a UI instead.
//!
//! # Example
//!
//! ```rust
//! use cv_bid_analyser::{AnalysisConfig, AnalysisProgressCallback, Stage};
//! use std::sync::{Arc, Mutex};
//!
//! struct StageLog(Mutex<Vec<Stage>>);
//!
//! impl AnalysisProgressCallback for StageLog {
//!     fn on_stage(&self, stage: Stage) {
//!         self.0.lock().unwrap().push(stage);
//!     }
//! }
//!
//! let log = Arc::new(StageLog(Mutex::new(Vec::new())));
//! let config = AnalysisConfig::builder()
//!     .progress_callback(log as Arc<dyn AnalysisProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::error::DocumentRole;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Non-terminal stages of a run, in the order they are entered.
///
/// Terminal states (result, warning, error) are not stages: they are the
/// `Result` returned by [`crate::analyze`] and rendered by
/// [`crate::present::present`], after which the pipeline is idle again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Checking that both documents were supplied.
    Validating,
    /// Reading text out of the documents.
    Extracting,
    /// Both texts are non-blank and the prompt has been built.
    PromptReady,
    /// The inference request is in flight.
    Requesting,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Validating => "validating",
            Stage::Extracting => "extracting",
            Stage::PromptReady => "prompt ready",
            Stage::Requesting => "requesting",
        };
        f.write_str(s)
    }
}

/// Called by the pipeline as a run progresses.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait AnalysisProgressCallback: Send + Sync {
    /// Called on entry to each stage.
    fn on_stage(&self, stage: Stage) {
        let _ = stage;
    }

    /// Called after one document's text has been extracted.
    ///
    /// # Arguments
    /// * `role`     — which upload was read
    /// * `filename` — its filename
    /// * `chars`    — characters of extracted text (0 for unrecognised formats)
    fn on_document_extracted(&self, role: DocumentRole, filename: &str, chars: usize) {
        let _ = (role, filename, chars);
    }

    /// Called once the run reaches a terminal state.
    ///
    /// # Arguments
    /// * `success` — whether a model result was produced
    fn on_analysis_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl AnalysisProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::AnalysisConfig`].
pub type ProgressCallback = Arc<dyn AnalysisProgressCallback>;
