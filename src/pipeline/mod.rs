//! Pipeline stages for CV-vs-bid analysis.
//!
//! Each submodule implements exactly one step, so each can be tested on its
//! own and swapped without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ prompts ──▶ llm ──▶ postprocess
//! (path/URL) (pdf/docx)  (template)  (HTTP)  (cleanup)
//! ```
//!
//! 1. [`input`]   — read a local file or download a URL into memory
//! 2. [`extract`] — plain text from PDF/DOCX bytes; runs in `spawn_blocking`
//! 3. [`crate::prompts`] — truncate both texts and fill the template
//! 4. [`llm`]     — one request to the inference endpoint; the only stage
//!    with network I/O after input
//! 5. [`postprocess`] — deterministic cleanup of the model's answer

pub mod extract;
pub mod input;
pub mod llm;
pub mod postprocess;
