//! Remote OCR delegate
//!
//! Sends the whole PDF to the table-extraction service and relays back its
//! workbook. When the service is unreachable, unhealthy or answers without a
//! workbook, the local fallback runs exactly once. Timeouts of the processing
//! call and explicit error statuses are surfaced instead.

use base64::{engine::general_purpose::STANDARD, Engine};
use pdfutil_core::naming::sheet_file_name;
use pdfutil_core::{Artifact, InputFile, PdfUtilError, Progress, PDF_MIME};
use reqwest::StatusCode;
use serde::Deserialize;

use crate::client::{read_failure, ServiceClient};
use crate::config::ServiceConfig;
use crate::error::RemoteError;
use crate::local_ocr::{LocalOcr, PageRecognizer, TesseractRecognizer};

/// Status the service uses when processing was cut short
const STATUS_CLIENT_CLOSED: u16 = 499;

#[derive(Debug, Deserialize)]
struct ProcessPdfResponse {
    #[serde(default)]
    success: bool,
    excel_base64: Option<String>,
    filename: Option<String>,
}

/// Probe and processing clients for one OCR service
#[derive(Debug, Clone)]
struct RemoteOcr {
    probe: ServiceClient,
    process: ServiceClient,
    timeout_minutes: u64,
}

/// How a remote attempt ended when it did not fail outright
enum RemoteOutcome {
    Done(Artifact),
    Fallback(String),
}

#[derive(Debug, Clone)]
pub struct OcrDelegate<R = TesseractRecognizer> {
    remote: Option<RemoteOcr>,
    local: LocalOcr<R>,
}

impl OcrDelegate<TesseractRecognizer> {
    /// Remote service from `config.ocr_api_url` (if any), Tesseract fallback
    pub fn from_config(config: &ServiceConfig) -> Result<Self, PdfUtilError> {
        Self::with_recognizer(config, TesseractRecognizer)
    }
}

impl<R: PageRecognizer> OcrDelegate<R> {
    pub fn with_recognizer(config: &ServiceConfig, recognizer: R) -> Result<Self, PdfUtilError> {
        let remote = match config.ocr_api_url.as_deref() {
            Some(base_url) => Some(RemoteOcr {
                probe: ServiceClient::new(base_url, Some(config.probe_timeout()))?,
                process: ServiceClient::new(base_url, Some(config.ocr_timeout()))?,
                timeout_minutes: config.ocr_timeout_secs / 60,
            }),
            None => None,
        };

        Ok(Self {
            remote,
            local: LocalOcr::new(recognizer, config),
        })
    }

    /// Scanned PDF to OCR workbook
    #[tracing::instrument(skip_all, fields(file = %file.name, size = file.size()))]
    pub async fn ocr_to_sheet(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<Artifact, PdfUtilError> {
        progress.report(5.0, "Starting OCR...");

        if let Some(remote) = &self.remote {
            match remote.attempt(file, progress).await? {
                RemoteOutcome::Done(artifact) => {
                    progress.report(100.0, "Complete");
                    return Ok(artifact);
                }
                RemoteOutcome::Fallback(reason) => {
                    tracing::warn!(reason = %reason, "OCR service unavailable, using local OCR");
                }
            }
        }

        let artifact = self.local.run(file, progress).await?;
        progress.report(100.0, "Complete");
        Ok(artifact)
    }
}

impl RemoteOcr {
    async fn attempt(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<RemoteOutcome, PdfUtilError> {
        progress.report(10.0, "Checking OCR service...");
        match self.probe.get("/health").send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => {
                return Ok(RemoteOutcome::Fallback(format!(
                    "health check returned {}",
                    response.status()
                )))
            }
            Err(e) => return Ok(RemoteOutcome::Fallback(e.to_string())),
        }

        progress.report(20.0, "Processing on OCR service...");
        let request = self
            .process
            .post_file("/process-pdf", file, PDF_MIME, &[])?;

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Err(self.timeout_error()),
            Err(e) => return Ok(RemoteOutcome::Fallback(e.to_string())),
        };

        if !response.status().is_success() {
            let (status, message, _) = read_failure(response).await;
            let message = message.unwrap_or_else(|| status_message(status));
            tracing::error!(status = status.as_u16(), message = %message, "OCR service failed");
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let body: ProcessPdfResponse = match response.json().await {
            Ok(body) => body,
            Err(e) if e.is_timeout() => return Err(self.timeout_error()),
            Err(e) => return Ok(RemoteOutcome::Fallback(format!("unreadable response: {}", e))),
        };

        let encoded = match body.excel_base64 {
            Some(encoded) if body.success => encoded,
            _ => {
                return Ok(RemoteOutcome::Fallback(
                    "service returned no workbook".to_string(),
                ))
            }
        };

        let bytes = match STANDARD.decode(encoded.trim()) {
            Ok(bytes) => bytes,
            Err(e) => return Ok(RemoteOutcome::Fallback(format!("invalid workbook: {}", e))),
        };
        progress.report(90.0, "Downloading spreadsheet...");

        let file_name = body
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| sheet_file_name(&file.name, true));

        tracing::info!(file_name = %file_name, size = bytes.len(), "OCR service complete");
        Ok(RemoteOutcome::Done(Artifact::xlsx(file_name, bytes)))
    }

    fn timeout_error(&self) -> PdfUtilError {
        PdfUtilError::NetworkError(format!(
            "Timeout: processing took longer than {} minutes. Try a smaller PDF or split the file into parts.",
            self.timeout_minutes
        ))
    }
}

/// Message for an error status that came without a JSON `error` field
fn status_message(status: StatusCode) -> String {
    match status.as_u16() {
        STATUS_CLIENT_CLOSED => {
            "Timeout: processing is taking too long. Try a smaller PDF or split the file."
                .to_string()
        }
        502 => "Server error: the API could not process the file. Try again.".to_string(),
        code => format!(
            "Error {}: {}",
            code,
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}
