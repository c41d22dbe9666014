//! Page transcript extraction
//!
//! Walks a page's content stream in stored order, producing one text run per
//! text-showing operator, then folds runs into lines. Runs are never
//! reordered, so multi-column layouts come out in content-stream order.

use crate::document::PdfDocument;
use crate::error::PdfUtilError;
use crate::fonts::{page_fonts, FontDecoder};
use lopdf::content::Content;
use lopdf::Object;
use std::collections::BTreeMap;

/// Baseline shift (in text space units) that starts a new line
const LINE_EPSILON: f32 = 1.0;

/// `TJ` adjustment (thousandths of an em) treated as a word gap
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// One fragment of positioned text
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    /// Last run of its line
    pub ends_line: bool,
}

type Matrix = [f32; 6];

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

struct TextState {
    tm: Matrix,
    tlm: Matrix,
    leading: f32,
    font: Option<Vec<u8>>,
}

impl TextState {
    fn new() -> Self {
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
            font: None,
        }
    }

    fn begin(&mut self) {
        self.tm = IDENTITY;
        self.tlm = IDENTITY;
    }

    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.tm = self.tlm;
    }

    fn set_matrix(&mut self, m: Matrix) {
        self.tlm = m;
        self.tm = m;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn numbers<const N: usize>(operands: &[Object]) -> Option<[f32; N]> {
    if operands.len() < N {
        return None;
    }
    let mut out = [0.0; N];
    for (slot, obj) in out.iter_mut().zip(operands) {
        *slot = number(obj)?;
    }
    Some(out)
}

struct RunCollector {
    runs: Vec<TextRun>,
    fonts: BTreeMap<Vec<u8>, FontDecoder>,
    fallback: FontDecoder,
}

impl RunCollector {
    fn push(&mut self, state: &TextState, text: String) {
        if text.is_empty() {
            return;
        }
        let (x, y) = (state.tm[4], state.tm[5]);

        if let Some(prev) = self.runs.last_mut() {
            if (prev.y - y).abs() > LINE_EPSILON {
                prev.ends_line = true;
            }
        }

        self.runs.push(TextRun {
            text,
            x,
            y,
            ends_line: false,
        });
    }

    fn decode(&self, state: &TextState, bytes: &[u8]) -> String {
        state
            .font
            .as_ref()
            .and_then(|name| self.fonts.get(name))
            .unwrap_or(&self.fallback)
            .decode(bytes)
    }
}

/// Extract the positioned text runs of one page (zero-based index)
pub fn extract_runs(
    document: &PdfDocument,
    page_index: usize,
) -> Result<Vec<TextRun>, PdfUtilError> {
    let page = document.page(page_index)?;
    let doc = document.inner();

    let content = doc
        .get_page_content(page.id)
        .map_err(|e| PdfUtilError::ParseError(format!("Page {}: {}", page.number, e)))?;

    let operations = match Content::decode(&content) {
        Ok(content) => content.operations,
        Err(e) => {
            tracing::warn!(page = page.number, error = %e, "Unreadable content stream");
            return Ok(Vec::new());
        }
    };

    let mut state = TextState::new();
    let mut collector = RunCollector {
        runs: Vec::new(),
        fonts: page_fonts(doc, page.id),
        fallback: FontDecoder::default(),
    };

    for op in &operations {
        let operands = op.operands.as_slice();
        match op.operator.as_str() {
            "BT" => state.begin(),
            "Tf" => {
                state.font = operands.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec);
            }
            "TL" => {
                if let Some([leading]) = numbers::<1>(operands) {
                    state.leading = leading;
                }
            }
            "Td" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    state.translate(tx, ty);
                }
            }
            "TD" => {
                if let Some([tx, ty]) = numbers::<2>(operands) {
                    state.leading = -ty;
                    state.translate(tx, ty);
                }
            }
            "Tm" => {
                if let Some(m) = numbers::<6>(operands) {
                    state.set_matrix(m);
                }
            }
            "T*" => state.next_line(),
            "Tj" => {
                if let Some(Ok(bytes)) = operands.first().map(Object::as_str) {
                    let text = collector.decode(&state, bytes);
                    collector.push(&state, text);
                }
            }
            "'" => {
                state.next_line();
                if let Some(Ok(bytes)) = operands.first().map(Object::as_str) {
                    let text = collector.decode(&state, bytes);
                    collector.push(&state, text);
                }
            }
            "\"" => {
                state.next_line();
                if let Some(Ok(bytes)) = operands.get(2).map(Object::as_str) {
                    let text = collector.decode(&state, bytes);
                    collector.push(&state, text);
                }
            }
            "TJ" => {
                let Some(Ok(items)) = operands.first().map(Object::as_array) else {
                    continue;
                };
                let mut text = String::new();
                for item in items {
                    match item {
                        Object::String(bytes, _) => text.push_str(&collector.decode(&state, bytes)),
                        other => {
                            let wide_gap =
                                number(other).is_some_and(|adj| adj < TJ_SPACE_THRESHOLD);
                            if wide_gap && !text.is_empty() && !text.ends_with(' ') {
                                text.push(' ');
                            }
                        }
                    }
                }
                collector.push(&state, text);
            }
            _ => {}
        }
    }

    let mut runs = collector.runs;
    if let Some(last) = runs.last_mut() {
        last.ends_line = true;
    }

    tracing::debug!(page = page.number, runs = runs.len(), "Extracted text runs");
    Ok(runs)
}

/// Fold runs into lines.
///
/// Each run contributes its text plus one space; a run marked `ends_line`
/// flushes the buffer. Whitespace-only lines are dropped and the buffer is
/// always flushed at the end.
pub fn runs_to_lines(runs: &[TextRun]) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    let mut flush = |current: &mut String| {
        let trimmed = current.trim();
        if !trimmed.is_empty() {
            lines.push(trimmed.to_string());
        }
        current.clear();
    };

    for run in runs {
        if !run.text.is_empty() {
            current.push_str(&run.text);
            current.push(' ');
        }
        if run.ends_line {
            flush(&mut current);
        }
    }
    flush(&mut current);

    lines
}

/// Extract the ordered lines of one page (zero-based index)
pub fn extract_lines(
    document: &PdfDocument,
    page_index: usize,
) -> Result<Vec<String>, PdfUtilError> {
    Ok(runs_to_lines(&extract_runs(document, page_index)?))
}

/// Lines of every page, one entry per page in document order
pub fn extract_all_pages(document: &PdfDocument) -> Result<Vec<Vec<String>>, PdfUtilError> {
    (0..document.page_count())
        .map(|index| extract_lines(document, index))
        .collect()
}
