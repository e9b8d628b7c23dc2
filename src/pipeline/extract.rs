//! Text extraction: uploaded bytes → plain text.
//!
//! The parser is chosen from the filename suffix alone:
//!
//! | Suffix  | Parser   | Output |
//! |---------|----------|--------|
//! | `.pdf`  | lopdf    | page texts in page order, joined with `\n`; blank pages skipped |
//! | `.docx` | docx-rs  | one line per paragraph, table cells tab-separated per row |
//! | other   | —        | empty string, no error |
//!
//! Both parsers are synchronous and can be slow or even panic on hostile
//! input, so [`extract_text`] runs them under `spawn_blocking` and turns a
//! panic into [`ExtractionError::ParserPanicked`].

use crate::error::ExtractionError;
use crate::pipeline::input::UploadedDocument;
use docx_rs::{
    DocumentChild, Paragraph, ParagraphChild, Run, RunChild, Table, TableCellContent, TableChild,
    TableRowChild,
};
use tracing::{debug, warn};

/// Document formats the extractor recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Unsupported,
}

impl DocumentFormat {
    /// Pick the format from the filename suffix (case-insensitive).
    pub fn from_filename(filename: &str) -> Self {
        let lower = filename.to_ascii_lowercase();
        if lower.ends_with(".pdf") {
            DocumentFormat::Pdf
        } else if lower.ends_with(".docx") {
            DocumentFormat::Docx
        } else {
            DocumentFormat::Unsupported
        }
    }
}

/// Extract plain text from an uploaded document, consuming it.
pub async fn extract_text(document: UploadedDocument) -> Result<String, ExtractionError> {
    let UploadedDocument { bytes, filename } = document;

    tokio::task::spawn_blocking(move || extract_text_blocking(&bytes, &filename))
        .await
        .map_err(|e| ExtractionError::ParserPanicked {
            detail: if e.is_panic() {
                panic_message(e.into_panic())
            } else {
                e.to_string()
            },
        })?
}

/// Blocking implementation of [`extract_text`].
pub fn extract_text_blocking(bytes: &[u8], filename: &str) -> Result<String, ExtractionError> {
    match DocumentFormat::from_filename(filename) {
        DocumentFormat::Pdf => pdf_text(bytes),
        DocumentFormat::Docx => docx_text(bytes),
        DocumentFormat::Unsupported => {
            debug!("No parser for '{}', treating as empty", filename);
            Ok(String::new())
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

// ── PDF ──────────────────────────────────────────────────────────────────

fn pdf_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ExtractionError::Pdf {
        detail: e.to_string(),
    })?;

    let pages = doc.get_pages();
    let mut texts: Vec<String> = Vec::with_capacity(pages.len());

    for &page_num in pages.keys() {
        match doc.extract_text(&[page_num]) {
            Ok(text) => {
                let text = text.trim_end();
                if text.trim().is_empty() {
                    debug!("PDF page {} has no text, skipped", page_num);
                } else {
                    texts.push(text.to_string());
                }
            }
            Err(e) => warn!("PDF page {}: text extraction failed, skipped: {}", page_num, e),
        }
    }

    debug!("Extracted text from {}/{} PDF pages", texts.len(), pages.len());
    Ok(texts.join("\n"))
}

// ── DOCX ─────────────────────────────────────────────────────────────────

fn docx_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractionError::Docx {
        detail: e.to_string(),
    })?;

    let mut lines: Vec<String> = Vec::new();
    for child in &docx.document.children {
        match child {
            DocumentChild::Paragraph(p) => lines.push(paragraph_text(p)),
            DocumentChild::Table(t) => push_table_lines(t, &mut lines),
            _ => {}
        }
    }

    Ok(lines.join("\n"))
}

fn paragraph_text(paragraph: &Paragraph) -> String {
    let mut text = String::new();
    push_paragraph_children(&paragraph.children, &mut text);
    text
}

fn push_paragraph_children(children: &[ParagraphChild], out: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(run, out),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, out),
            _ => {}
        }
    }
}

fn push_run_text(run: &Run, out: &mut String) {
    for child in &run.children {
        match child {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}

fn push_table_lines(table: &Table, lines: &mut Vec<String>) {
    for row in &table.rows {
        let TableChild::TableRow(row) = row;
        let mut cells: Vec<String> = Vec::new();
        for cell in &row.cells {
            let TableRowChild::TableCell(cell) = cell;
            let mut cell_text: Vec<String> = Vec::new();
            for content in &cell.children {
                match content {
                    TableCellContent::Paragraph(p) => cell_text.push(paragraph_text(p)),
                    TableCellContent::Table(nested) => push_table_lines(nested, lines),
                    _ => {}
                }
            }
            cells.push(cell_text.join(" "));
        }
        if cells.iter().any(|c| !c.trim().is_empty()) {
            lines.push(cells.join("\t"));
        }
    }
}
