//! Document pipeline for the PDF utility site
//!
//! Everything here runs in-process: loading, page transcript extraction,
//! tabular reconstruction, spreadsheet emission, merge, split and lossless
//! compression. Operations that cross a network boundary live in
//! `pdfutil-remote`.
//!
//! Every operation takes a [`Progress`] and reports a percentage that never
//! goes backwards. Failures are [`PdfUtilError`]s; entry points resolve them
//! to user-facing text with [`PdfUtilError::user_message`].

pub mod artifact;
pub mod compress;
pub mod convert;
pub mod document;
pub mod error;
pub mod extract;
pub mod fonts;
pub mod merge;
pub mod naming;
pub mod pipeline;
pub mod progress;
pub mod sheet;
pub mod split;
pub mod table;

#[cfg(test)]
mod test_pdf;

pub use artifact::{Artifact, InputFile, PDF_MIME};
pub use compress::{compress_local, CompressionProfile, CompressionReport};
pub use convert::{convert_to_sheet, document_grid};
pub use document::{get_page_count, quick_validate, PageRef, PdfDocument, PdfInfo};
pub use error::{ErrorKind, PdfUtilError};
pub use extract::{extract_all_pages, extract_lines};
pub use merge::{merge_documents, merge_documents_with_progress};
pub use pipeline::{run, PdfCommand, ProcessMetrics, ProcessResult};
pub use progress::Progress;
pub use sheet::{emit_workbook, SheetOptions, XLSX_MIME};
pub use split::{extract_page, split_all, split_selected};
pub use table::{Grid, GridBuilder, Padding, Row};

/// Parse page range string like "1-3, 5, 8-10" into sorted unique page numbers
///
/// Only pages in `1..=page_count` are kept; a range reaching past the end
/// stops at the last page.
pub fn parse_ranges(input: &str, page_count: u32) -> Result<Vec<u32>, PdfUtilError> {
    use std::collections::BTreeSet;

    let mut pages = BTreeSet::new();

    for part in input.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|_| PdfUtilError::InvalidRange(format!("Invalid start: {}", start)))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|_| PdfUtilError::InvalidRange(format!("Invalid end: {}", end)))?;

            if start > end {
                return Err(PdfUtilError::InvalidRange(format!(
                    "Start {} > end {}",
                    start, end
                )));
            }

            pages.extend(start.max(1)..=end.min(page_count));
        } else {
            let page: u32 = part
                .parse()
                .map_err(|_| PdfUtilError::InvalidRange(format!("Invalid page: {}", part)))?;
            if (1..=page_count).contains(&page) {
                pages.insert(page);
            }
        }
    }

    Ok(pages.into_iter().collect())
}
