//! PDF to spreadsheet conversion for documents with selectable text

use crate::artifact::Artifact;
use crate::document::PdfDocument;
use crate::error::PdfUtilError;
use crate::extract::extract_lines;
use crate::naming::sheet_file_name;
use crate::progress::Progress;
use crate::sheet::{emit_workbook, SheetOptions};
use crate::table::{Grid, GridBuilder, Padding};

/// Reconstruct the rows of every page into one grid. Rows keep their own
/// cell count.
pub fn document_grid(doc: &PdfDocument, progress: &mut Progress<'_>) -> Result<Grid, PdfUtilError> {
    let total = doc.page_count();
    let mut builder = GridBuilder::new();

    for index in 0..total {
        let lines = extract_lines(doc, index)?;
        tracing::debug!(page = index + 1, lines = lines.len(), "Extracted page text");
        builder.push_page(&lines);
        progress.report_step(30.0, 50.0, index + 1, total, "Reading pages...");
    }

    Ok(builder.build(Padding::Ragged))
}

/// Convert a text PDF into a single-sheet workbook named after the source
pub fn convert_to_sheet(
    bytes: &[u8],
    source_name: &str,
    progress: &mut Progress<'_>,
) -> Result<Artifact, PdfUtilError> {
    progress.report(10.0, "Loading PDF...");
    let doc = PdfDocument::load(bytes)?;
    progress.report(20.0, "Reading document...");
    progress.report(30.0, "Reading pages...");

    let grid = document_grid(&doc, progress)?;
    progress.report(85.0, "Building spreadsheet...");

    let workbook = emit_workbook(&grid, &SheetOptions::text())?;
    progress.report(95.0, "Saving spreadsheet...");

    tracing::info!(
        source = source_name,
        pages = doc.page_count(),
        rows = grid.rows.len(),
        "Converted PDF to spreadsheet"
    );
    Ok(Artifact::xlsx(sheet_file_name(source_name, false), workbook))
}
