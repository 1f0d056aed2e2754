// PDF text extraction used by the /extract-pdf route.
// Keep this module free of HTTP concerns; callers decide how to surface errors.

use std::collections::BTreeMap;

use lopdf::{Document, Encoding, Object, ObjectId};
use thiserror::Error;
use tracing::debug;

/// A `TJ` kerning adjustment wider than this (in thousandths of an em) is a word gap.
const TJ_WORD_GAP: i64 = -100;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("failed to parse PDF document: {0}")]
    Parse(#[source] lopdf::Error),

    #[error("failed to parse PDF document: buffer is empty")]
    Empty,

    #[error("failed to extract text from page {page}: {source}")]
    Page {
        page: u32,
        #[source]
        source: lopdf::Error,
    },
}

/// Extracts text from a PDF stored fully in memory.
///
/// Pages are visited in ascending page number. Every non-empty text run on a page
/// is appended followed by a single space, so the result keeps a trailing space
/// whenever at least one run was found. A document without pages yields `""`.
pub fn extract_text_from_pdf_mem(bytes: &[u8]) -> Result<String, PdfError> {
    if bytes.is_empty() {
        return Err(PdfError::Empty);
    }

    let document = Document::load_mem(bytes).map_err(PdfError::Parse)?;
    let pages = document.get_pages();
    debug!("Parsed PDF with {} page(s)", pages.len());

    let mut text = String::new();
    for (page, page_id) in pages {
        for run in page_text_runs(&document, page, page_id)? {
            text.push_str(&run);
            text.push(' ');
        }
    }

    Ok(text)
}

/// Returns the text runs of a single page in content-stream order.
///
/// Each text-showing operator (`Tj`, `TJ`, `'`, `"`) yields one run, decoded with
/// the encoding of the font selected by the preceding `Tf`.
fn page_text_runs(document: &Document, page: u32, page_id: ObjectId) -> Result<Vec<String>, PdfError> {
    let page_error = |source| PdfError::Page { page, source };

    let encodings: BTreeMap<Vec<u8>, Encoding> = document
        .get_page_fonts(page_id)
        .map_err(page_error)?
        .into_iter()
        .filter_map(|(name, font)| match font.get_font_encoding(document) {
            Ok(encoding) => Some((name, encoding)),
            Err(e) => {
                debug!(
                    "Page {}: font {} has no usable encoding: {}",
                    page,
                    String::from_utf8_lossy(&name),
                    e
                );
                None
            }
        })
        .collect();

    let content = document
        .get_and_decode_page_content(page_id)
        .map_err(page_error)?;

    let mut encoding: Option<&Encoding> = None;
    let mut runs = Vec::new();
    for operation in &content.operations {
        let shown = match operation.operator.as_str() {
            "Tf" => {
                encoding = operation
                    .operands
                    .first()
                    .and_then(|font| font.as_name().ok())
                    .and_then(|font| encodings.get(font));
                continue;
            }
            // `'` and `"` carry the string as their last operand.
            "Tj" | "'" | "\"" => match operation.operands.last() {
                Some(Object::String(bytes, _)) => decode(encoding, bytes).map_err(page_error)?,
                _ => continue,
            },
            "TJ" => match operation.operands.first() {
                Some(Object::Array(items)) => decode_tj_array(encoding, items).map_err(page_error)?,
                _ => continue,
            },
            _ => continue,
        };

        if !shown.trim().is_empty() {
            runs.push(shown);
        }
    }

    Ok(runs)
}

/// Joins the strings of one `TJ` array, turning wide negative kerning into spaces.
fn decode_tj_array(encoding: Option<&Encoding>, items: &[Object]) -> lopdf::Result<String> {
    let mut run = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => run.push_str(&decode(encoding, bytes)?),
            Object::Integer(adjust) if *adjust < TJ_WORD_GAP => run.push(' '),
            Object::Real(adjust) if (*adjust as f64) < TJ_WORD_GAP as f64 => run.push(' '),
            _ => {}
        }
    }
    Ok(run)
}

/// Without a known font encoding the bytes are read as (lossy) UTF-8, which is
/// exact for the ASCII range most simple fonts use.
fn decode(encoding: Option<&Encoding>, bytes: &[u8]) -> lopdf::Result<String> {
    match encoding {
        Some(encoding) => Document::decode_text(encoding, bytes),
        None => Ok(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Returns true if given content-type or head indicates a PDF file.
/// - Content-Type: application/pdf (case-insensitive, substring match)
/// - Magic bytes: %PDF-
pub fn is_pdf(content_type: Option<&str>, head: &[u8]) -> bool {
    let ct = content_type.unwrap_or("").to_ascii_lowercase();
    ct.contains("application/pdf") || head.starts_with(b"%PDF-")
}
