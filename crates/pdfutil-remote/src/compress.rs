//! Compression through the remote service, or in-process when none is
//! configured
//!
//! Figures from the service are measured; the local pass only reports the
//! profile's assumed reduction.

use base64::{engine::general_purpose::STANDARD, Engine};
use pdfutil_core::naming::compressed_file_name;
use pdfutil_core::{
    compress_local, Artifact, CompressionProfile, CompressionReport, InputFile, PdfUtilError,
    Progress, PDF_MIME,
};
use serde::Deserialize;

use crate::client::{read_failure, ServiceClient};
use crate::config::ServiceConfig;
use crate::error::RemoteError;

const COMPRESS_FAILED: &str = "Failed to compress PDF";

#[derive(Debug, Deserialize)]
struct CompressResponse {
    pdf: String,
    filename: Option<String>,
    original_size: usize,
    compressed_size: usize,
    reduction_percentage: f64,
}

#[derive(Debug, Clone)]
pub struct RemoteCompressor {
    client: ServiceClient,
}

impl RemoteCompressor {
    pub fn new(base_url: &str) -> Result<Self, PdfUtilError> {
        Ok(Self {
            client: ServiceClient::new(base_url, None)?,
        })
    }

    #[tracing::instrument(skip_all, fields(file = %file.name, profile = profile.as_str()))]
    pub async fn compress(
        &self,
        file: &InputFile,
        profile: CompressionProfile,
        progress: &mut Progress<'_>,
    ) -> Result<CompressionReport, PdfUtilError> {
        progress.report(20.0, "Uploading PDF...");
        let response = self
            .client
            .post_file(
                "/compress-pdf",
                file,
                PDF_MIME,
                &[("compression_level", profile.as_str().to_string())],
            )?
            .send()
            .await
            .map_err(RemoteError::from)?;

        if !response.status().is_success() {
            let (status, message, _) = read_failure(response).await;
            return Err(RemoteError::ApiError {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| COMPRESS_FAILED.to_string()),
            }
            .into());
        }
        progress.report(60.0, "Compressing...");

        let body: CompressResponse = response.json().await.map_err(RemoteError::from)?;
        let bytes = STANDARD
            .decode(body.pdf.trim())
            .map_err(|e| RemoteError::InvalidResponse(format!("pdf is not base64: {}", e)))?;
        progress.report(80.0, "Downloading...");

        let file_name = body
            .filename
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| compressed_file_name(&file.name));

        tracing::info!(
            original = body.original_size,
            compressed = body.compressed_size,
            reduction = body.reduction_percentage,
            "Remote compression complete"
        );

        Ok(CompressionReport {
            artifact: Artifact::pdf(file_name, bytes),
            original_size: body.original_size,
            compressed_size: body.compressed_size,
            reduction_percentage: body.reduction_percentage,
            measured: true,
        })
    }
}

/// Remote when a compression service is configured, local otherwise
#[derive(Debug, Clone)]
pub enum Compressor {
    Remote(RemoteCompressor),
    Local,
}

impl Compressor {
    pub fn from_config(config: &ServiceConfig) -> Result<Self, PdfUtilError> {
        match config.compress_api_url.as_deref() {
            Some(base_url) => Ok(Compressor::Remote(RemoteCompressor::new(base_url)?)),
            None => Ok(Compressor::Local),
        }
    }

    pub async fn compress(
        &self,
        file: &InputFile,
        profile: CompressionProfile,
        progress: &mut Progress<'_>,
    ) -> Result<CompressionReport, PdfUtilError> {
        let report = match self {
            Compressor::Remote(remote) => remote.compress(file, profile, progress).await?,
            Compressor::Local => compress_local(&file.bytes, &file.name, profile, progress)?,
        };
        progress.report(100.0, "Complete");
        Ok(report)
    }
}
