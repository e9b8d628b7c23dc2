//! Post-processing: deterministic cleanup of the model's answer.
//!
//! Hosted text-generation endpoints return raw completions. Depending on the
//! model the text may repeat the whole prompt before the answer (decoder-only
//! models such as Mistral do this unless told otherwise), wrap everything in
//! a ```` ```markdown ```` fence, or carry `\r\n` line endings and invisible
//! characters. Each rule below is a pure `&str → String` function.
//!
//! Rules (applied in order):
//! 1. Strip an echoed copy of the prompt
//! 2. Normalise line endings (CRLF → LF)
//! 3. Strip outer markdown fences
//! 4. Trim trailing whitespace per line
//! 5. Collapse runs of blank lines
//! 6. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 7. Trim leading blank lines and end with exactly one newline

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to a raw model response.
pub fn clean_response(raw: &str, prompt: &str) -> String {
    let s = strip_echoed_prompt(raw, prompt);
    let s = normalise_line_endings(&s);
    let s = strip_markdown_fences(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    finish_text(&s)
}

// ── Rule 1: Strip echoed prompt ──────────────────────────────────────────────

fn strip_echoed_prompt(raw: &str, prompt: &str) -> String {
    let prompt = prompt.trim();
    let trimmed = raw.trim_start();
    if !prompt.is_empty() {
        if let Some(rest) = trimmed.strip_prefix(prompt) {
            return rest.to_string();
        }
    }
    raw.to_string()
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse blank-line runs ─────────────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{2060}'], "")
}

// ── Rule 7: Leading/trailing blank lines ────────────────────────────────────

fn finish_text(input: &str) -> String {
    let trimmed = input.trim_start_matches('\n').trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}
