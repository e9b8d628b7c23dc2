//! # cv-bid-analyser
//!
//! Compare a candidate CV against a bid or job description with a hosted
//! language model.
//!
//! Both documents (PDF or DOCX) are reduced to plain text, each text is cut
//! to a fixed character budget, the pair is interpolated into an instruction
//! template, and the prompt is sent in a single request to a Hugging Face
//! inference endpoint. The model's answer (match percentage, strengths,
//! missing qualifications, suggestions) comes back as free text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! CV + Bid
//!  │
//!  ├─ 1. Validate  both uploads present, else MissingUpload
//!  ├─ 2. Extract   PDF / DOCX → plain text (CPU-bound, spawn_blocking)
//!  ├─ 3. Prompt    truncate each text, fill the template (job first)
//!  ├─ 4. Infer     one POST to the inference endpoint
//!  ├─ 5. Polish    strip echoed prompt, fences, stray whitespace
//!  └─ 6. Present   success / warning / error notice
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cv_bid_analyser::{analyze_files, present, AnalysisConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Token read from secrets.toml or HF_TOKEN
//!     let config = AnalysisConfig::default();
//!     let result = analyze_files(Some("cv.pdf"), Some("job.docx"), &config).await;
//!     let notice = present(&result);
//!     println!("{}\n{}", notice.headline, notice.body);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `cvbid` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! cv-bid-analyser = { version = "0.3", default-features = false }
//! ```
//!
//! ## Choosing a Model
//!
//! | Preset | Model | Chars per document | Notes |
//! |--------|-------|--------------------|-------|
//! | `FlanT5Base` | `google/flan-t5-base` | 1500 | Default, short plain answers |
//! | `Mistral7BInstruct` | `mistralai/Mistral-7B-Instruct-v0.2` | 2000 | Longer Markdown answers |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod analyze;
pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod present;
pub mod progress;
pub mod prompts;
pub mod secrets;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use analyze::{analyze, analyze_files, analyze_sync, analyze_to_file};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ModelPreset, PromptTemplate};
pub use error::{AnalyserError, DocumentRole, ExtractionError};
pub use output::{AnalysisOutput, AnalysisStats};
pub use pipeline::input::UploadedDocument;
pub use pipeline::llm::{HuggingFaceClient, InferenceClient, InferenceResponse};
pub use present::{present, Notice, Severity};
pub use progress::{AnalysisProgressCallback, NoopProgressCallback, ProgressCallback, Stage};
pub use secrets::ApiToken;
