//! Pipeline entry point
//!
//! A caller builds one [`PdfCommand`], runs it, and gets back a
//! [`ProcessResult`] whose error (if any) is already the message to show.

use crate::artifact::{Artifact, InputFile};
use crate::compress::{compress_local, CompressionProfile};
use crate::convert::convert_to_sheet;
use crate::error::PdfUtilError;
use crate::merge::merge_documents_with_progress;
use crate::naming::merged_file_name;
use crate::progress::Progress;
use crate::split::{split_all, split_selected};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum PdfCommand {
    Merge {
        files: Vec<InputFile>,
    },
    SplitAll {
        file: InputFile,
    },
    SplitSelected {
        file: InputFile,
        pages: Vec<u32>,
    },
    Convert {
        file: InputFile,
    },
    CompressLocal {
        file: InputFile,
        #[serde(default)]
        profile: CompressionProfile,
    },
}

impl PdfCommand {
    pub fn name(&self) -> &'static str {
        match self {
            PdfCommand::Merge { .. } => "merge",
            PdfCommand::SplitAll { .. } => "split_all",
            PdfCommand::SplitSelected { .. } => "split_selected",
            PdfCommand::Convert { .. } => "convert",
            PdfCommand::CompressLocal { .. } => "compress",
        }
    }

    fn input_size(&self) -> usize {
        match self {
            PdfCommand::Merge { files } => files.iter().map(InputFile::size).sum(),
            PdfCommand::SplitAll { file }
            | PdfCommand::SplitSelected { file, .. }
            | PdfCommand::Convert { file }
            | PdfCommand::CompressLocal { file, .. } => file.size(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    pub artifacts: Vec<Artifact>,
    /// User-facing message
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

impl ProcessResult {
    fn failed(error: &PdfUtilError) -> Self {
        Self {
            success: false,
            artifacts: Vec::new(),
            error: Some(error.user_message()),
            metrics: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub artifact_count: usize,
    pub processing_time_ms: u64,
    /// Reduction shown for compression, assumed unless measured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percentage: Option<f64>,
}

/// Run one command to completion
pub fn run(command: PdfCommand, progress: &mut Progress<'_>) -> ProcessResult {
    let started = chrono::Utc::now();
    let name = command.name();
    let input_size = command.input_size();

    match execute(command, progress) {
        Ok((artifacts, reduction_percentage)) => {
            progress.report(100.0, "Complete");
            let elapsed = chrono::Utc::now() - started;
            let metrics = ProcessMetrics {
                input_size_bytes: input_size,
                output_size_bytes: artifacts.iter().map(Artifact::size).sum(),
                artifact_count: artifacts.len(),
                processing_time_ms: elapsed.num_milliseconds().max(0) as u64,
                reduction_percentage,
            };
            tracing::info!(
                command = name,
                artifacts = metrics.artifact_count,
                ms = metrics.processing_time_ms,
                "Command complete"
            );
            ProcessResult {
                success: true,
                artifacts,
                error: None,
                metrics: Some(metrics),
            }
        }
        Err(e) => {
            tracing::warn!(command = name, kind = ?e.kind(), error = %e, "Command failed");
            ProcessResult::failed(&e)
        }
    }
}

fn execute(
    command: PdfCommand,
    progress: &mut Progress<'_>,
) -> Result<(Vec<Artifact>, Option<f64>), PdfUtilError> {
    match command {
        PdfCommand::Merge { files } => {
            let documents = files.into_iter().map(|f| f.bytes).collect();
            let merged = merge_documents_with_progress(documents, progress)?;
            progress.report(95.0, "Preparing download...");
            let file_name = merged_file_name(chrono::Utc::now().timestamp_millis());
            Ok((vec![Artifact::pdf(file_name, merged)], None))
        }
        PdfCommand::SplitAll { file } => {
            Ok((split_all(&file.bytes, &file.name, progress)?, None))
        }
        PdfCommand::SplitSelected { file, pages } => Ok((
            split_selected(&file.bytes, &file.name, &pages, progress)?,
            None,
        )),
        PdfCommand::Convert { file } => {
            Ok((vec![convert_to_sheet(&file.bytes, &file.name, progress)?], None))
        }
        PdfCommand::CompressLocal { file, profile } => {
            let report = compress_local(&file.bytes, &file.name, profile, progress)?;
            Ok((vec![report.artifact], Some(report.reduction_percentage)))
        }
    }
}
