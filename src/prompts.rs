//! Prompt templates and the prompt builder.
//!
//! Every instruction sent to the model is assembled here so the wording can
//! be reviewed and unit-tested without a network round-trip. The builder is
//! pure: identical inputs always give an identical prompt.
//!
//! Callers can supply their own template via
//! [`crate::config::PromptTemplate::Custom`]; it must contain the
//! [`BID_PLACEHOLDER`] and [`CV_PLACEHOLDER`] markers.

use crate::config::PromptTemplate;

/// Marker replaced by the (truncated) bid / job description text.
pub const BID_PLACEHOLDER: &str = "{bid}";

/// Marker replaced by the (truncated) candidate CV text.
pub const CV_PLACEHOLDER: &str = "{cv}";

/// Template of the first revision: plain numbered answer.
pub const CLASSIC_TEMPLATE: &str = "
Compare this candidate CV against the job description.

JOB DESCRIPTION:
{bid}

CANDIDATE CV:
{cv}

Provide:
1. Match percentage (0–100%)
2. Top 3 strengths
3. Top 3 missing qualifications
4. Suggestions for improvement
";

/// Template of the later revisions: same items, answer requested in Markdown.
pub const MARKDOWN_TEMPLATE: &str = "
Compare this candidate CV against the job description.

JOB DESCRIPTION:
{bid}

CANDIDATE CV:
{cv}

Provide:
1. Match percentage (0–100%)
2. Top 3 strengths
3. Top 3 missing qualifications
4. Suggestions for improvement

Format the whole response in Markdown, with a short heading for each of the four items.
";

/// Return the template text for a [`PromptTemplate`].
pub fn template_text(template: &PromptTemplate) -> &str {
    match template {
        PromptTemplate::Classic => CLASSIC_TEMPLATE,
        PromptTemplate::Markdown => MARKDOWN_TEMPLATE,
        PromptTemplate::Custom(text) => text,
    }
}

/// Longest prefix of `text` holding at most `limit` characters.
///
/// Counts Unicode scalar values, never splits a code point, and is
/// idempotent: truncating the result again returns it unchanged.
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the prompt: bid / job text first, candidate CV second.
///
/// Both inputs are truncated to `limit` characters. The caller guarantees
/// both are non-blank; this function does not check.
pub fn build_prompt(bid_text: &str, cv_text: &str, limit: usize, template: &PromptTemplate) -> String {
    render_template(
        template_text(template),
        truncate_chars(bid_text, limit),
        truncate_chars(cv_text, limit),
    )
}

/// Characters the template contributes on its own, excluding placeholders.
pub fn template_overhead(template: &PromptTemplate) -> usize {
    render_template(template_text(template), "", "").chars().count()
}

/// Single left-to-right pass, so placeholder-looking text inside a document
/// is never substituted a second time.
fn render_template(template: &str, bid: &str, cv: &str) -> String {
    let mut out = String::with_capacity(template.len() + bid.len() + cv.len());
    let mut rest = template;

    loop {
        let next = [(BID_PLACEHOLDER, bid), (CV_PLACEHOLDER, cv)]
            .into_iter()
            .filter_map(|(marker, value)| rest.find(marker).map(|pos| (pos, marker, value)))
            .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, marker, value)) => {
                out.push_str(&rest[..pos]);
                out.push_str(value);
                rest = &rest[pos + marker.len()..];
            }
            None => {
                out.push_str(rest);
                return out;
            }
        }
    }
}
