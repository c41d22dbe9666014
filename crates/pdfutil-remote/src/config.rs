//! Service configuration
//!
//! Base URLs of the remote services plus the OCR tuning knobs. Loaded from
//! the environment or from a TOML file; every field has a default so an
//! empty file is a valid configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const OCR_API_URL_VAR: &str = "PDFUTIL_OCR_API_URL";
pub const COMPRESS_API_URL_VAR: &str = "PDFUTIL_COMPRESS_API_URL";
pub const TIFF_API_URL_VAR: &str = "PDFUTIL_TIFF_API_URL";

/// PDF user space units per inch
const POINTS_PER_INCH: f64 = 72.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// OCR/table-extraction service; `None` goes straight to local OCR
    pub ocr_api_url: Option<String>,
    /// Compression service; `None` compresses in-process
    pub compress_api_url: Option<String>,
    /// TIFF conversion service; required for TIFF conversion
    pub tiff_api_url: Option<String>,
    /// Liveness probe timeout (default: 3)
    pub probe_timeout_secs: u64,
    /// Whole-call timeout of the OCR processing request (default: 900)
    pub ocr_timeout_secs: u64,
    /// Tesseract language for the local fallback (default: "por")
    pub ocr_language: String,
    /// Rasterization upscale factor for the local fallback (default: 2.0)
    pub raster_scale: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ocr_api_url: None,
            compress_api_url: None,
            tiff_api_url: None,
            probe_timeout_secs: 3,
            ocr_timeout_secs: 15 * 60,
            ocr_language: "por".to_string(),
            raster_scale: 2.0,
        }
    }
}

impl ServiceConfig {
    /// Defaults, with service URLs taken from `PDFUTIL_*_API_URL`
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            ocr_api_url: lookup(OCR_API_URL_VAR),
            compress_api_url: lookup(COMPRESS_API_URL_VAR),
            tiff_api_url: lookup(TIFF_API_URL_VAR),
            ..Self::default()
        }
        .normalized()
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(s).context("Failed to parse TOML configuration")?;
        Ok(config.normalized())
    }

    fn normalized(mut self) -> Self {
        self.ocr_api_url = self.ocr_api_url.as_deref().and_then(normalize_base_url);
        self.compress_api_url = self.compress_api_url.as_deref().and_then(normalize_base_url);
        self.tiff_api_url = self.tiff_api_url.as_deref().and_then(normalize_base_url);
        self
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }

    /// Raster resolution for the local fallback
    pub fn raster_dpi(&self) -> u32 {
        (POINTS_PER_INCH * self.raster_scale).round().max(1.0) as u32
    }
}

/// Trim, default the scheme to `https://` and drop trailing slashes.
/// Blank values mean "not configured".
pub fn normalize_base_url(url: &str) -> Option<String> {
    let url = url.trim().trim_end_matches('/');
    if url.is_empty() {
        return None;
    }
    if url.starts_with("http://") || url.starts_with("https://") {
        Some(url.to_string())
    } else {
        Some(format!("https://{}", url))
    }
}
