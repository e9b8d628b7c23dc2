//! Analysis entry points: run the whole pipeline for one CV / bid pair.
//!
//! A run is strictly sequential and stateless:
//!
//! ```text
//! Validating ─▶ Extracting ─▶ PromptReady ─▶ Requesting ─▶ Ok(AnalysisOutput)
//!     │              │
//!     │              ├─▶ Err(Extraction)      parser rejected a document
//!     │              └─▶ Err(EmptyInput)      no text; no request is made
//!     └─▶ Err(MissingUpload)                  nothing is read
//!                                   Requesting ─▶ Err(Decode | Transport | …)
//! ```
//!
//! Every failure is terminal for the run and nothing is retried.

use crate::config::AnalysisConfig;
use crate::error::{AnalyserError, DocumentRole};
use crate::output::{AnalysisOutput, AnalysisStats};
use crate::pipeline::extract::extract_text;
use crate::pipeline::input::UploadedDocument;
use crate::pipeline::llm::{HuggingFaceClient, InferenceClient};
use crate::pipeline::postprocess::clean_response;
use crate::progress::Stage;
use crate::prompts::build_prompt;
use crate::secrets::resolve_token;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Analyse a CV against a bid / job description.
///
/// This is the primary entry point for the library. Either document may be
/// `None`, mirroring a form submitted with an upload missing; that yields
/// [`AnalyserError::MissingUpload`] before anything is read.
///
/// # Errors
/// - `MissingUpload` — one or both documents absent
/// - `Extraction` — a parser rejected a document
/// - `EmptyInput` — a document has no text; the model is not called
/// - `CredentialMissing` — no token and no pre-built client
/// - `Decode`, `Transport`, `ApiTimeout` — the inference call failed
pub async fn analyze(
    cv: Option<UploadedDocument>,
    bid: Option<UploadedDocument>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalyserError> {
    let total_start = Instant::now();
    enter(config, Stage::Validating);

    let result = match (cv, bid) {
        (Some(cv), Some(bid)) => run_pipeline(cv, bid, config, total_start).await,
        (cv, bid) => Err(missing_upload(cv.is_some(), bid.is_some())),
    };
    finish(config, &result);
    result
}

/// Analyse documents given as local paths or HTTP(S) URLs.
pub async fn analyze_files(
    cv: Option<&str>,
    bid: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalyserError> {
    let total_start = Instant::now();
    enter(config, Stage::Validating);

    let result = match (cv, bid) {
        (Some(cv), Some(bid)) => {
            load_and_run(cv, bid, config, total_start).await
        }
        (cv, bid) => Err(missing_upload(cv.is_some(), bid.is_some())),
    };
    finish(config, &result);
    result
}

/// Analyse and write the cleaned answer directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn analyze_to_file(
    cv: Option<&str>,
    bid: Option<&str>,
    output_path: impl AsRef<Path>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalyserError> {
    let output = analyze_files(cv, bid, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| AnalyserError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &output.analysis)
        .await
        .map_err(|e| AnalyserError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AnalyserError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output)
}

/// Synchronous wrapper around [`analyze_files`].
///
/// Creates a temporary tokio runtime internally.
pub fn analyze_sync(
    cv: Option<&str>,
    bid: Option<&str>,
    config: &AnalysisConfig,
) -> Result<AnalysisOutput, AnalyserError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| AnalyserError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(analyze_files(cv, bid, config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

async fn load_and_run(
    cv: &str,
    bid: &str,
    config: &AnalysisConfig,
    total_start: Instant,
) -> Result<AnalysisOutput, AnalyserError> {
    let cv = UploadedDocument::load(cv, config.download_timeout_secs).await?;
    let bid = UploadedDocument::load(bid, config.download_timeout_secs).await?;
    run_pipeline(cv, bid, config, total_start).await
}

async fn run_pipeline(
    cv: UploadedDocument,
    bid: UploadedDocument,
    config: &AnalysisConfig,
    total_start: Instant,
) -> Result<AnalysisOutput, AnalyserError> {
    info!("Starting analysis: CV '{}' vs bid '{}'", cv.filename, bid.filename);

    // ── Step 1: Resolve the inference client ─────────────────────────────
    let client = resolve_client(config).await?;

    // ── Step 2: Extract text ─────────────────────────────────────────────
    enter(config, Stage::Extracting);
    let extraction_start = Instant::now();
    let cv_text = extract(DocumentRole::Candidate, cv, config).await?;
    let bid_text = extract(DocumentRole::Comparison, bid, config).await?;
    let extraction_duration_ms = extraction_start.elapsed().as_millis() as u64;

    // ── Step 3: Both texts must carry content ────────────────────────────
    let empty: Vec<DocumentRole> = [
        (DocumentRole::Candidate, &cv_text),
        (DocumentRole::Comparison, &bid_text),
    ]
    .into_iter()
    .filter(|(_, text)| text.trim().is_empty())
    .map(|(role, _)| role)
    .collect();
    if !empty.is_empty() {
        warn!("Empty document text: {:?}", empty);
        return Err(AnalyserError::EmptyInput { empty });
    }

    // ── Step 4: Build the prompt ─────────────────────────────────────────
    let prompt = build_prompt(&bid_text, &cv_text, config.truncation_limit, &config.template);
    let prompt_chars = prompt.chars().count();
    enter(config, Stage::PromptReady);
    debug!("Prompt: {} chars (limit {} per document)", prompt_chars, config.truncation_limit);

    // ── Step 5: One inference request ────────────────────────────────────
    enter(config, Stage::Requesting);
    let inference_start = Instant::now();
    let raw_response = client.generate(prompt.clone()).await?;
    let inference_duration_ms = inference_start.elapsed().as_millis() as u64;

    // ── Step 6: Clean up the answer ──────────────────────────────────────
    let analysis = clean_response(&raw_response, &prompt);
    if analysis.trim().is_empty() {
        warn!("Model returned no usable text ({} raw chars)", raw_response.len());
        return Err(AnalyserError::Decode {
            detail: "model returned an empty answer".into(),
        });
    }

    let stats = AnalysisStats {
        cv_chars: cv_text.chars().count(),
        bid_chars: bid_text.chars().count(),
        truncation_limit: config.truncation_limit,
        prompt_chars,
        extraction_duration_ms,
        inference_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Analysis complete: {} chars of output in {}ms",
        analysis.len(),
        stats.total_duration_ms
    );

    Ok(AnalysisOutput {
        analysis,
        raw_response,
        model: client.model_name(),
        stats,
    })
}

async fn extract(
    role: DocumentRole,
    document: UploadedDocument,
    config: &AnalysisConfig,
) -> Result<String, AnalyserError> {
    let filename = document.filename.clone();
    let text = extract_text(document)
        .await
        .map_err(|source| AnalyserError::Extraction {
            role,
            filename: filename.clone(),
            source,
        })?;

    debug!("{} '{}': {} chars extracted", role, filename, text.len());
    if let Some(ref cb) = config.progress_callback {
        cb.on_document_extracted(role, &filename, text.chars().count());
    }
    Ok(text)
}

/// Pick the inference client: a pre-built one wins, otherwise a Hugging Face
/// client is built from the endpoint and the resolved token.
async fn resolve_client(config: &AnalysisConfig) -> Result<Arc<dyn InferenceClient>, AnalyserError> {
    if let Some(ref client) = config.client {
        return Ok(Arc::clone(client));
    }

    let token = resolve_token(config.api_token.as_ref(), config.secrets_path.as_deref()).await?;
    let client = HuggingFaceClient::new(
        config.endpoint_url(),
        token,
        config.max_new_tokens,
        config.api_timeout_secs,
    )?;
    Ok(Arc::new(client))
}

fn missing_upload(has_cv: bool, has_bid: bool) -> AnalyserError {
    let mut missing = Vec::new();
    if !has_cv {
        missing.push(DocumentRole::Candidate);
    }
    if !has_bid {
        missing.push(DocumentRole::Comparison);
    }
    AnalyserError::MissingUpload { missing }
}

fn enter(config: &AnalysisConfig, stage: Stage) {
    debug!("Stage: {}", stage);
    if let Some(ref cb) = config.progress_callback {
        cb.on_stage(stage);
    }
}

fn finish(config: &AnalysisConfig, result: &Result<AnalysisOutput, AnalyserError>) {
    if let Some(ref cb) = config.progress_callback {
        cb.on_analysis_complete(result.is_ok());
    }
}
