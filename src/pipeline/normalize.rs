//! Normalisation: turn raw document bytes into a provider-ready payload.
//!
//! The result is a tagged [`NormalizedPayload`] instead of a magic string, so
//! the dispatcher has to handle "needs OCR" and "nothing found" explicitly.
//!
//! ## Scanned-PDF heuristic
//!
//! A PDF whose text layer yields fewer than [`MIN_PDF_TEXT_LEN`] characters
//! is almost always a scan. Sending a near-empty text body to an LLM only
//! produces hallucinated tables, so those documents are flagged for OCR.

use super::classify::ContentCategory;
use crate::error::ExtractError;
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use tracing::{debug, info, warn};

/// Below this many extracted characters a PDF is treated as scanned.
pub const MIN_PDF_TEXT_LEN: usize = 100;

/// Unknown content smaller than this is tried as plain text.
pub const UNKNOWN_TEXT_LEN: usize = 10_000;

/// Returned instead of a provider call when nothing could be extracted.
pub const NOT_FOUND_TEXT: &str = "Text NOT FOUND in pdf/xlsx";

/// Outcome of normalising one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedPayload {
    /// Text ready to be appended to the prompt.
    Text(String),
    /// Image bytes to be sent inline; encoding is the dispatcher's job.
    Image,
    /// The PDF has no usable text layer and must go through OCR.
    NeedsOcr,
    /// Nothing usable; answer with [`NOT_FOUND_TEXT`].
    Empty,
}

/// Normalise `bytes` according to `category`.
pub fn normalize(bytes: &[u8], category: ContentCategory) -> Result<NormalizedPayload, ExtractError> {
    match category {
        ContentCategory::Text => Ok(NormalizedPayload::Text(decode_text(bytes))),
        ContentCategory::Unknown if bytes.len() < UNKNOWN_TEXT_LEN => {
            debug!("Unknown content of {} bytes treated as text", bytes.len());
            Ok(NormalizedPayload::Text(decode_text(bytes)))
        }
        ContentCategory::Unknown => {
            info!("Unknown content of {} bytes, nothing to extract", bytes.len());
            Ok(NormalizedPayload::Empty)
        }
        ContentCategory::Pdf => Ok(normalize_pdf(bytes)),
        ContentCategory::Spreadsheet => normalize_spreadsheet(bytes),
        ContentCategory::Image => Ok(NormalizedPayload::Image),
    }
}

fn decode_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

// ── PDF ─────────────────────────────────────────────────────────────────────

fn normalize_pdf(bytes: &[u8]) -> NormalizedPayload {
    match extract_pdf_pages(bytes) {
        Ok(pages) => pages_to_payload(&pages),
        Err(reason) => {
            warn!("PDF text extraction failed ({}); falling back to OCR", reason);
            NormalizedPayload::NeedsOcr
        }
    }
}

/// Extract the text of every page.
///
/// `pdf-extract` can panic on malformed fonts, so the call is isolated with
/// `catch_unwind` and a panic is reported like any other failure.
fn extract_pdf_pages(bytes: &[u8]) -> Result<Vec<String>, String> {
    match std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    })) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err("extractor panicked, likely a malformed font".to_string()),
    }
}

/// Assemble page texts with `--- Page N ---` markers, or flag for OCR.
pub fn pages_to_payload(pages: &[String]) -> NormalizedPayload {
    let text_len: usize = pages.iter().map(|p| p.chars().count()).sum();
    debug!("PDF: {} pages, {} chars of text", pages.len(), text_len);

    if text_len < MIN_PDF_TEXT_LEN {
        info!(
            "PDF text too short ({} < {} chars), likely scanned",
            text_len, MIN_PDF_TEXT_LEN
        );
        return NormalizedPayload::NeedsOcr;
    }

    let text = pages
        .iter()
        .enumerate()
        .map(|(i, page)| format!("--- Page {} ---\n{}", i + 1, page))
        .collect::<Vec<_>>()
        .join("\n\n");
    NormalizedPayload::Text(text)
}

// ── Spreadsheet ─────────────────────────────────────────────────────────────

fn normalize_spreadsheet(bytes: &[u8]) -> Result<NormalizedPayload, ExtractError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExtractError::Spreadsheet(e.to_string()))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| ExtractError::Spreadsheet(format!("sheet '{name}': {e}")))?;
        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_text).collect())
            .collect();
        sheets.push(render_sheet(&name, &rows));
    }

    if sheets.is_empty() {
        return Ok(NormalizedPayload::Empty);
    }
    debug!("Spreadsheet: {} sheets", sheets.len());
    Ok(NormalizedPayload::Text(sheets.join("\n\n")))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// Render one sheet as `--- Sheet: <name> ---` followed by an aligned table.
///
/// The first row is the header; every data row is prefixed with its
/// zero-based index, like a dataframe dump.
pub fn render_sheet(name: &str, rows: &[Vec<String>]) -> String {
    format!("--- Sheet: {} ---\n{}", name, render_table(rows))
}

fn render_table(rows: &[Vec<String>]) -> String {
    let Some((header, body)) = rows.split_first() else {
        return "Empty sheet".to_string();
    };

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let index_width = body.len().saturating_sub(1).to_string().len();

    let mut widths = vec![0usize; columns];
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let format_row = |label: &str, row: &[String]| -> String {
        let mut line = format!("{label:>index_width$}");
        for (i, width) in widths.iter().enumerate() {
            let cell = row.get(i).map(String::as_str).unwrap_or("");
            // One space after the index column, two between data columns.
            line.push_str(if i == 0 { " " } else { "  " });
            line.push_str(&format!("{cell:>width$}"));
        }
        line.trim_end().to_string()
    };

    let mut lines = Vec::with_capacity(rows.len());
    lines.push(format_row("", header));
    for (i, row) in body.iter().enumerate() {
        lines.push(format_row(&i.to_string(), row));
    }
    lines.join("\n")
}
