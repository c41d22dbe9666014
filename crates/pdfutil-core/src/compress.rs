//! Local PDF compression
//!
//! Lossless only: unreferenced objects and empty streams are dropped and the
//! remaining streams are Flate-compressed. The reduction reported for a
//! profile is an assumed figure, not a measurement.

use crate::artifact::Artifact;
use crate::document::PdfDocument;
use crate::error::PdfUtilError;
use crate::naming::compressed_file_name;
use crate::progress::Progress;
use lopdf::{Object, ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionProfile {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionProfile {
    /// Reduction shown to the user when nothing was measured
    pub fn assumed_reduction(self) -> f64 {
        match self {
            CompressionProfile::Low => 15.0,
            CompressionProfile::Medium => 40.0,
            CompressionProfile::High => 60.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionProfile::Low => "low",
            CompressionProfile::Medium => "medium",
            CompressionProfile::High => "high",
        }
    }
}

impl std::str::FromStr for CompressionProfile {
    type Err = PdfUtilError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(CompressionProfile::Low),
            "medium" => Ok(CompressionProfile::Medium),
            "high" => Ok(CompressionProfile::High),
            other => Err(PdfUtilError::ValidationError(format!(
                "Unknown compression level: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressionReport {
    pub artifact: Artifact,
    pub original_size: usize,
    pub compressed_size: usize,
    pub reduction_percentage: f64,
    /// False when `reduction_percentage` is the profile's assumed value
    pub measured: bool,
}

/// Compress in-process and report the profile's assumed reduction
pub fn compress_local(
    bytes: &[u8],
    source_name: &str,
    profile: CompressionProfile,
    progress: &mut Progress<'_>,
) -> Result<CompressionReport, PdfUtilError> {
    progress.report(20.0, "Loading PDF...");
    let mut doc = PdfDocument::load(bytes)?.into_inner();

    progress.report(60.0, "Compressing...");
    let empty: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter_map(|(id, object)| match object {
            Object::Stream(stream) if stream.content.is_empty() => Some(*id),
            _ => None,
        })
        .collect();
    for id in &empty {
        doc.delete_object(*id);
    }
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfUtilError::ProcessingError(format!("Failed to compress PDF: {}", e)))?;
    progress.report(80.0, "Finalizing...");

    tracing::info!(
        profile = profile.as_str(),
        original = bytes.len(),
        compressed = buffer.len(),
        empty_streams = empty.len(),
        "Local compression complete"
    );

    Ok(CompressionReport {
        original_size: bytes.len(),
        compressed_size: buffer.len(),
        reduction_percentage: profile.assumed_reduction(),
        measured: false,
        artifact: Artifact::pdf(compressed_file_name(source_name), buffer),
    })
}
