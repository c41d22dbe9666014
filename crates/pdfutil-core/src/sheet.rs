//! Spreadsheet emission
//!
//! Writes a grid to a single-sheet xlsx workbook.

use crate::error::PdfUtilError;
use crate::table::Grid;
use rust_xlsxwriter::{Workbook, XlsxError};

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub const TEXT_SHEET_NAME: &str = "Dados do PDF";
pub const OCR_SHEET_NAME: &str = "Dados do PDF (OCR)";

/// Widest column, in characters
pub const MAX_COLUMN_WIDTH: usize = 50;
const COLUMN_PADDING: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct SheetOptions {
    pub sheet_name: String,
}

impl SheetOptions {
    pub fn text() -> Self {
        Self {
            sheet_name: TEXT_SHEET_NAME.to_string(),
        }
    }

    pub fn ocr() -> Self {
        Self {
            sheet_name: OCR_SHEET_NAME.to_string(),
        }
    }
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self::text()
    }
}

impl From<XlsxError> for PdfUtilError {
    fn from(err: XlsxError) -> Self {
        PdfUtilError::ProcessingError(format!("Failed to write spreadsheet: {}", err))
    }
}

/// Column widths: longest cell (in chars) plus padding, capped
pub fn column_widths(grid: &Grid) -> Vec<usize> {
    (0..grid.width())
        .map(|col| {
            let longest = grid
                .all_rows()
                .filter_map(|row| row.get(col))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0);
            (longest + COLUMN_PADDING).min(MAX_COLUMN_WIDTH)
        })
        .collect()
}

/// Serialize the grid (header first) into workbook bytes
pub fn emit_workbook(grid: &Grid, options: &SheetOptions) -> Result<Vec<u8>, PdfUtilError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&options.sheet_name)?;

    for (r, row) in grid.all_rows().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                worksheet.write_string(r as u32, c as u16, cell.as_str())?;
            }
        }
    }

    for (c, width) in column_widths(grid).into_iter().enumerate() {
        worksheet.set_column_width(c as u16, width as f64)?;
    }

    let bytes = workbook.save_to_buffer()?;
    tracing::debug!(
        rows = grid.rows.len(),
        header = grid.header.is_some(),
        size = bytes.len(),
        "Workbook written"
    );
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{GridBuilder, Padding};
    use calamine::{open_workbook_from_rs, Reader, Xlsx};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn grid(pages: &[&[&str]], padding: Padding) -> Grid {
        let mut builder = GridBuilder::new();
        for lines in pages {
            builder.push_page(lines);
        }
        builder.build(padding)
    }

    fn read_back(bytes: Vec<u8>, sheet: &str) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(sheet).unwrap();
        range
            .rows()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_column_widths_are_capped() {
        let long = "x".repeat(80);
        let g = grid(&[&["id|name", &format!("1|{}", long)]], Padding::Ragged);
        assert_eq!(column_widths(&g), vec![4, MAX_COLUMN_WIDTH]);
    }

    #[test]
    fn test_column_widths_count_chars() {
        let g = grid(&[&["ação|b"]], Padding::Ragged);
        assert_eq!(column_widths(&g), vec![6, 3]);
    }

    #[test]
    fn test_emit_writes_header_then_rows() {
        let g = grid(&[&["Name|Age|City", "Ana|30|Lisboa"]], Padding::Ragged);
        let bytes = emit_workbook(&g, &SheetOptions::text()).unwrap();
        assert!(bytes.starts_with(b"PK"));

        let rows = read_back(bytes, TEXT_SHEET_NAME);
        assert_eq!(rows[0], vec!["Name", "Age", "City"]);
        assert_eq!(rows[1], vec!["Name", "Age", "City"]);
        assert_eq!(rows[2], vec!["Ana", "30", "Lisboa"]);
        assert_eq!(rows.len(), 3);
    }

    #[test]
    fn test_emit_uses_ocr_sheet_name() {
        let g = grid(&[&["a  b"]], Padding::Rectangular);
        let bytes = emit_workbook(&g, &SheetOptions::ocr()).unwrap();
        let rows = read_back(bytes, OCR_SHEET_NAME);
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_emit_empty_grid() {
        let bytes = emit_workbook(&Grid::default(), &SheetOptions::text()).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }
}
