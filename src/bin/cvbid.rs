//! CLI binary for cv-bid-analyser.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `AnalysisConfig` and prints the resulting notice.

use anyhow::{Context, Result};
use clap::Parser;
use cv_bid_analyser::{
    analyze_files, analyze_to_file, present, AnalysisConfig, AnalysisProgressCallback, ApiToken,
    DocumentRole, ModelPreset, ProgressCallback, PromptTemplate, Severity, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that follows the run through its stages.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Shown while the inference request is in flight.
    model: String,
}

impl CliProgressCallback {
    fn new(model: String) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar, model })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        match stage {
            Stage::Validating => self.bar.set_message("Checking uploads…"),
            Stage::Extracting => {
                self.bar.set_prefix("Reading");
                self.bar.set_message("Reading documents…");
            }
            Stage::PromptReady => self.bar.set_message("Building prompt…"),
            Stage::Requesting => {
                self.bar.set_prefix("Analyzing");
                self.bar.set_message(format!("Analyzing with {}…", self.model));
            }
        }
    }

    fn on_document_extracted(&self, role: DocumentRole, filename: &str, chars: usize) {
        self.bar.println(format!(
            "  {} {:<3}  {}  {}",
            green("✓"),
            role.label(),
            filename,
            dim(&format!("{chars} chars")),
        ));
    }

    fn on_analysis_complete(&self, _success: bool) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Compare a CV with a job description
  cvbid --cv resume.pdf --bid job.docx

  # Write the answer to a file
  cvbid --cv resume.docx --bid tender.pdf -o analysis.md

  # Larger model, Markdown answer
  cvbid --preset mistral-7b-instruct --cv resume.pdf --bid job.pdf

  # Self-hosted endpoint with a custom prompt
  cvbid --endpoint http://localhost:8080/generate --template prompt.txt \
        --cv resume.pdf --bid job.pdf

  # JSON output with stats
  cvbid --json --cv resume.pdf --bid job.pdf > result.json

PRESETS:
  Preset                Model                                Chars/doc  Template
  ───────────────────   ──────────────────────────────────   ─────────  ────────
  flan-t5-base (def.)   google/flan-t5-base                  1500       classic
  mistral-7b-instruct   mistralai/Mistral-7B-Instruct-v0.2   2000       markdown

CUSTOM TEMPLATES:
  A template file must contain the {bid} and {cv} placeholders; each is
  replaced once by the truncated text of the corresponding document.

TOKEN LOOKUP (first match wins):
  1. --token
  2. [huggingface] token = "..." in --secrets, secrets.toml or .streamlit/secrets.toml
  3. HF_TOKEN, then HUGGINGFACE_TOKEN

EXIT CODES:
  0  analysis complete
  2  a document is missing
  1  any other error
"#;

/// Compare a CV against a bid or job description with a hosted language model.
#[derive(Parser, Debug)]
#[command(
    name = "cvbid",
    version,
    about = "Compare a CV against a bid or job description with a hosted language model",
    long_about = "Extract text from a CV and a bid / job description (PDF or DOCX, local files \
or URLs), send both to a Hugging Face inference endpoint, and print the model's assessment: \
match percentage, strengths, missing qualifications and suggestions.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// CV / résumé: local PDF or DOCX path, or HTTP/HTTPS URL.
    #[arg(long)]
    cv: Option<String>,

    /// Bid or job description: local PDF or DOCX path, or HTTP/HTTPS URL.
    #[arg(long)]
    bid: Option<String>,

    /// Write the analysis to this file instead of stdout.
    #[arg(short, long, env = "CVBID_OUTPUT")]
    output: Option<PathBuf>,

    /// Model preset (sets model, truncation limit, template, token budget).
    #[arg(long, env = "CVBID_PRESET", value_enum, default_value = "flan-t5-base")]
    preset: PresetArg,

    /// Hugging Face model id, overriding the preset's.
    #[arg(long, env = "CVBID_MODEL")]
    model: Option<String>,

    /// Full inference URL; overrides the model id.
    #[arg(long, env = "CVBID_ENDPOINT")]
    endpoint: Option<String>,

    /// Characters kept from each document.
    #[arg(long, env = "CVBID_TRUNCATE",
          value_parser = clap::value_parser!(u64).range(1..))]
    truncate: Option<u64>,

    /// Upper bound on generated tokens, sent as parameters.max_new_tokens.
    #[arg(long, env = "CVBID_MAX_NEW_TOKENS",
          value_parser = clap::value_parser!(u32).range(1..))]
    max_new_tokens: Option<u32>,

    /// Path to a text file with a custom prompt template.
    #[arg(long, env = "CVBID_TEMPLATE")]
    template: Option<PathBuf>,

    /// Hugging Face API token.
    #[arg(long)]
    token: Option<String>,

    /// TOML secrets file with a [huggingface] token entry.
    #[arg(long, env = "CVBID_SECRETS")]
    secrets: Option<PathBuf>,

    /// Output structured JSON (AnalysisOutput) instead of Markdown.
    #[arg(long, env = "CVBID_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "CVBID_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CVBID_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CVBID_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "CVBID_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Inference request timeout in seconds (transport default when unset).
    #[arg(long, env = "CVBID_API_TIMEOUT")]
    api_timeout: Option<u64>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum PresetArg {
    #[value(name = "flan-t5-base")]
    FlanT5Base,
    #[value(name = "mistral-7b-instruct")]
    Mistral7BInstruct,
}

impl From<PresetArg> for ModelPreset {
    fn from(v: PresetArg) -> Self {
        match v {
            PresetArg::FlanT5Base => ModelPreset::FlanT5Base,
            PresetArg::Mistral7BInstruct => ModelPreset::Mistral7BInstruct,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports progress, so library INFO logs are muted
    // while it runs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(model_label(&cli));
        Some(cb as Arc<dyn AnalysisProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = match cli.output {
        Some(ref path) => analyze_to_file(cli.cv.as_deref(), cli.bid.as_deref(), path, &config).await,
        None => analyze_files(cli.cv.as_deref(), cli.bid.as_deref(), &config).await,
    };
    let notice = present(&result);

    match (&result, notice.severity) {
        (Ok(output), Severity::Success) => {
            if cli.json {
                let json =
                    serde_json::to_string_pretty(output).context("Failed to serialise output")?;
                println!("{json}");
            } else if let Some(ref path) = cli.output {
                if !cli.quiet {
                    eprintln!(
                        "{} {}  →  {}",
                        green("✔"),
                        bold(&notice.headline),
                        bold(&path.display().to_string())
                    );
                }
            } else {
                if !cli.quiet {
                    eprintln!("{} {}", green("✔"), bold(&notice.headline));
                }
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(notice.body.as_bytes())
                    .context("Failed to write to stdout")?;
                if !notice.body.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            }

            if !cli.quiet && !cli.json {
                let stats = &output.stats;
                eprintln!(
                    "   {}  {} / {} chars{}  —  {}ms total",
                    dim(&output.model),
                    stats.cv_chars,
                    stats.bid_chars,
                    if stats.truncated() {
                        format!(" (cut to {})", stats.truncation_limit)
                    } else {
                        String::new()
                    },
                    stats.total_duration_ms,
                );
            }
        }
        (_, Severity::Warning) => {
            eprintln!("{} {}", yellow("⚠"), bold(&notice.headline));
        }
        _ => {
            eprintln!("{} {}", red("✘"), red(&notice.headline));
            if !notice.body.is_empty() {
                eprintln!("  {}", dim(&notice.body));
            }
        }
    }

    std::process::exit(notice.severity.exit_code());
}

/// Name shown by the spinner during the inference request.
fn model_label(cli: &Cli) -> String {
    if let Some(ref endpoint) = cli.endpoint {
        return endpoint.clone();
    }
    cli.model
        .clone()
        .unwrap_or_else(|| ModelPreset::from(cli.preset).model_id().to_string())
}

/// Map CLI args to `AnalysisConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .preset(cli.preset.into())
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref endpoint) = cli.endpoint {
        builder = builder.endpoint(endpoint.clone());
    }
    if let Some(limit) = cli.truncate {
        let limit = usize::try_from(limit).context("Truncation limit is too large")?;
        builder = builder.truncation_limit(limit);
    }
    if let Some(n) = cli.max_new_tokens {
        builder = builder.max_new_tokens(Some(n));
    }
    if let Some(ref path) = cli.template {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt template from {:?}", path))?;
        builder = builder.template(PromptTemplate::Custom(text));
    }
    if let Some(ref token) = cli.token {
        builder = builder.api_token(ApiToken::new(token.clone()));
    }
    if let Some(ref path) = cli.secrets {
        builder = builder.secrets_path(path.clone());
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
