//! Output file names

/// Strip a case-insensitive extension from the end of `name`
fn strip_ext<'a>(name: &'a str, ext: &str) -> Option<&'a str> {
    let split = name.len().checked_sub(ext.len())?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, tail) = name.split_at(split);
    tail.eq_ignore_ascii_case(ext).then_some(stem)
}

/// Name without a trailing `.pdf`
pub fn pdf_stem(name: &str) -> &str {
    strip_ext(name, ".pdf").unwrap_or(name)
}

/// `report.pdf` -> `report_pagina_3.pdf`
pub fn page_file_name(source: &str, page_number: u32) -> String {
    format!("{}_pagina_{}.pdf", pdf_stem(source), page_number)
}

/// `report.pdf` -> `report.xlsx`, or `report_OCR.xlsx` for the OCR path
pub fn sheet_file_name(source: &str, ocr: bool) -> String {
    let suffix = if ocr { "_OCR" } else { "" };
    format!("{}{}.xlsx", pdf_stem(source), suffix)
}

/// `report.pdf` -> `report_comprimido.pdf`
pub fn compressed_file_name(source: &str) -> String {
    format!("{}_comprimido.pdf", pdf_stem(source))
}

/// Merged output, stamped with milliseconds since the Unix epoch
pub fn merged_file_name(timestamp_millis: i64) -> String {
    format!("PDFs_Mesclados_{}.pdf", timestamp_millis)
}

/// `scan.tiff` / `scan.TIF` -> `scan.pdf`
pub fn tiff_to_pdf_file_name(source: &str) -> String {
    let stem = strip_ext(source, ".tiff")
        .or_else(|| strip_ext(source, ".tif"))
        .unwrap_or(source);
    format!("{}.pdf", stem)
}

/// Whether the name carries a `.tif` / `.tiff` extension
pub fn is_tiff_name(name: &str) -> bool {
    strip_ext(name, ".tiff").is_some() || strip_ext(name, ".tif").is_some()
}
