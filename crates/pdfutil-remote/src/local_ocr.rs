//! Local OCR fallback
//!
//! Each page is rasterized and recognized in turn; the recognized lines go
//! through the same column-splitting chain as the text path, but rows are
//! padded to a rectangular grid before the workbook is written.

use pdfutil_core::naming::sheet_file_name;
use pdfutil_core::sheet::{emit_workbook, SheetOptions};
use pdfutil_core::{
    Artifact, Grid, GridBuilder, InputFile, Padding, PdfDocument, PdfUtilError, Progress,
};
use std::future::Future;
use std::path::Path;
use tokio::process::Command;

use crate::config::ServiceConfig;
use crate::error::RemoteError;

/// Message shown whenever the local fallback fails, whatever the cause
pub const LOCAL_OCR_FAILED: &str = "Failed to process the PDF with OCR";

/// One page to recognize
#[derive(Debug, Clone, Copy)]
pub struct PageImage<'a> {
    /// PDF written to disk for the external tools
    pub pdf_path: &'a Path,
    /// Scratch directory that outlives the call
    pub work_dir: &'a Path,
    /// One-based page number
    pub page_number: u32,
    pub dpi: u32,
    pub language: &'a str,
}

/// Turns one page into recognized text
pub trait PageRecognizer {
    fn recognize(
        &self,
        page: PageImage<'_>,
    ) -> impl Future<Output = Result<String, RemoteError>> + Send;
}

/// `pdftoppm` to rasterize, `tesseract` to recognize
#[derive(Debug, Clone, Copy, Default)]
pub struct TesseractRecognizer;

impl TesseractRecognizer {
    async fn rasterize(page: &PageImage<'_>) -> Result<std::path::PathBuf, RemoteError> {
        let prefix = page.work_dir.join(format!("page-{}", page.page_number));
        let number = page.page_number.to_string();

        let status = Command::new("pdftoppm")
            .arg("-png")
            .arg("-r")
            .arg(page.dpi.to_string())
            .arg("-f")
            .arg(&number)
            .arg("-l")
            .arg(&number)
            .arg("-singlefile")
            .arg(page.pdf_path)
            .arg(&prefix)
            .status()
            .await?;

        if !status.success() {
            return Err(RemoteError::Tool {
                tool: "pdftoppm",
                message: format!("page {}: {}", page.page_number, status),
            });
        }

        Ok(prefix.with_extension("png"))
    }
}

impl PageRecognizer for TesseractRecognizer {
    async fn recognize(&self, page: PageImage<'_>) -> Result<String, RemoteError> {
        let image = Self::rasterize(&page).await?;

        let output = Command::new("tesseract")
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(page.language)
            .output()
            .await?;

        if !output.status.success() {
            return Err(RemoteError::Tool {
                tool: "tesseract",
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Tesseract ends each page with a form feed
        Ok(String::from_utf8_lossy(&output.stdout).replace('\x0c', ""))
    }
}

/// Trimmed, non-empty lines of recognized text
pub fn recognized_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Rasterize-and-recognize pipeline producing the OCR workbook
#[derive(Debug, Clone)]
pub struct LocalOcr<R = TesseractRecognizer> {
    recognizer: R,
    language: String,
    dpi: u32,
}

impl LocalOcr<TesseractRecognizer> {
    pub fn tesseract(config: &ServiceConfig) -> Self {
        Self::new(TesseractRecognizer, config)
    }
}

impl<R: PageRecognizer> LocalOcr<R> {
    pub fn new(recognizer: R, config: &ServiceConfig) -> Self {
        Self {
            recognizer,
            language: config.ocr_language.clone(),
            dpi: config.raster_dpi(),
        }
    }

    /// Run the fallback; any failure becomes the generic OCR failure message
    #[tracing::instrument(skip_all, fields(file = %file.name))]
    pub async fn run(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<Artifact, PdfUtilError> {
        self.run_inner(file, progress).await.map_err(|e| {
            tracing::error!(error = %e, "Local OCR failed");
            PdfUtilError::ProcessingError(LOCAL_OCR_FAILED.to_string())
        })
    }

    async fn run_inner(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<Artifact, PdfUtilError> {
        progress.report(10.0, "Starting local OCR...");
        let grid = self.recognize_grid(file, progress).await?;

        progress.report(85.0, "Building spreadsheet...");
        let workbook = emit_workbook(&grid, &SheetOptions::ocr())?;
        progress.report(95.0, "Saving spreadsheet...");

        Ok(Artifact::xlsx(sheet_file_name(&file.name, true), workbook))
    }

    /// Recognize every page, in order, into one rectangular grid
    pub async fn recognize_grid(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<Grid, PdfUtilError> {
        let page_count = PdfDocument::load(&file.bytes)?.page_count();

        let work_dir = tempfile::Builder::new()
            .prefix("pdfutil_ocr_")
            .tempdir()
            .map_err(RemoteError::from)?;
        let pdf_path = work_dir.path().join("input.pdf");
        tokio::fs::write(&pdf_path, &file.bytes)
            .await
            .map_err(RemoteError::from)?;

        let mut builder = GridBuilder::new();
        for index in 0..page_count {
            let page_number = index as u32 + 1;
            let text = self
                .recognizer
                .recognize(PageImage {
                    pdf_path: &pdf_path,
                    work_dir: work_dir.path(),
                    page_number,
                    dpi: self.dpi,
                    language: &self.language,
                })
                .await?;

            let lines = recognized_lines(&text);
            tracing::debug!(page = page_number, lines = lines.len(), "Recognized page");
            builder.push_page(&lines);
            progress.report_step(10.0, 70.0, index + 1, page_count, "Recognizing text...");
        }

        let grid = builder.build(Padding::Rectangular);
        tracing::info!(pages = page_count, rows = grid.rows.len(), "Local OCR complete");
        Ok(grid)
    }
}
