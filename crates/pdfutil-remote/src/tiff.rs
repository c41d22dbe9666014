//! TIFF to PDF through the conversion service

use pdfutil_core::naming::{is_tiff_name, tiff_to_pdf_file_name};
use pdfutil_core::{Artifact, InputFile, PdfUtilError, Progress};
use serde::{Deserialize, Serialize};

use crate::client::{read_failure, ServiceClient};
use crate::config::ServiceConfig;
use crate::error::RemoteError;

/// Largest accepted upload
pub const MAX_TIFF_BYTES: usize = 50 * 1024 * 1024;

const TIFF_MIME: &str = "image/tiff";

/// What the service reports about an uploaded TIFF
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TiffInfo {
    pub pages: u32,
    pub size_mb: f64,
    pub width: u32,
    pub height: u32,
    pub mode: String,
}

/// Reject anything that is not a `.tif`/`.tiff` of at most 50 MiB
pub fn validate_tiff(file: &InputFile) -> Result<(), PdfUtilError> {
    if !is_tiff_name(&file.name) {
        return Err(PdfUtilError::ValidationError(
            "Select a TIFF file (.tiff or .tif)".into(),
        ));
    }
    if file.size() > MAX_TIFF_BYTES {
        return Err(PdfUtilError::ValidationError(
            "File too large. Maximum size: 50MB".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct TiffConverter {
    client: ServiceClient,
}

impl TiffConverter {
    pub fn new(base_url: &str) -> Result<Self, PdfUtilError> {
        Ok(Self {
            client: ServiceClient::new(base_url, None)?,
        })
    }

    pub fn from_config(config: &ServiceConfig) -> Result<Self, PdfUtilError> {
        let base_url = config
            .tiff_api_url
            .as_deref()
            .ok_or(RemoteError::NotConfigured("TIFF conversion"))?;
        Self::new(base_url)
    }

    #[tracing::instrument(skip_all, fields(file = %file.name))]
    pub async fn info(&self, file: &InputFile) -> Result<TiffInfo, PdfUtilError> {
        validate_tiff(file)?;

        let response = self
            .client
            .post_file("/convert/info", file, TIFF_MIME, &[])?
            .send()
            .await
            .map_err(RemoteError::from)?;

        if !response.status().is_success() {
            let (status, message, text) = read_failure(response).await;
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message: message.unwrap_or(text),
            }
            .into());
        }

        Ok(response.json().await.map_err(RemoteError::from)?)
    }

    #[tracing::instrument(skip_all, fields(file = %file.name))]
    pub async fn convert(
        &self,
        file: &InputFile,
        progress: &mut Progress<'_>,
    ) -> Result<Artifact, PdfUtilError> {
        validate_tiff(file)?;
        progress.report(20.0, "Uploading TIFF...");

        let response = self
            .client
            .post_file("/convert?optimize=true", file, TIFF_MIME, &[])?
            .send()
            .await
            .map_err(RemoteError::from)?;

        if !response.status().is_success() {
            let (status, _, text) = read_failure(response).await;
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message: format!("Conversion error: {}", text),
            }
            .into());
        }
        progress.report(80.0, "Downloading PDF...");

        let bytes = response.bytes().await.map_err(RemoteError::from)?.to_vec();
        let file_name = tiff_to_pdf_file_name(&file.name);
        progress.report(100.0, "Complete");

        tracing::info!(file_name = %file_name, size = bytes.len(), "TIFF converted");
        Ok(Artifact::pdf(file_name, bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_tiff_extension() {
        assert!(validate_tiff(&InputFile::new("scan.TIFF", vec![0; 10])).is_ok());
        assert!(validate_tiff(&InputFile::new("scan.tif", vec![0; 10])).is_ok());
        let err = validate_tiff(&InputFile::new("scan.png", vec![0; 10])).unwrap_err();
        assert!(matches!(err, PdfUtilError::ValidationError(_)));
    }

    #[test]
    fn test_validate_tiff_size_limit() {
        let at_limit = InputFile::new("big.tif", vec![0; MAX_TIFF_BYTES]);
        assert!(validate_tiff(&at_limit).is_ok());

        let over = InputFile::new("big.tif", vec![0; MAX_TIFF_BYTES + 1]);
        assert_eq!(
            validate_tiff(&over).unwrap_err().user_message(),
            "File too large. Maximum size: 50MB"
        );
    }

    #[test]
    fn test_unconfigured_converter() {
        let err = TiffConverter::from_config(&ServiceConfig::default()).unwrap_err();
        assert!(matches!(err, PdfUtilError::ValidationError(_)));
    }
}
