use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfUtilError {
    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF is password protected")]
    Encrypted,

    #[error("Invalid input: {0}")]
    ValidationError(String),

    #[error("Invalid page range: {0}")]
    InvalidRange(String),

    #[error("Processing failed: {0}")]
    ProcessingError(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}

/// Coarse classification used at pipeline boundaries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input is not a usable document; the user must pick another file
    Parse,
    /// Caller arguments are out of contract; nothing was processed
    Validation,
    /// A downstream step failed after validation passed
    Processing,
    /// Connection failure or timeout talking to a remote service
    Network,
}

impl ErrorKind {
    /// Network failures are a kind of processing failure
    pub fn is_processing(self) -> bool {
        matches!(self, ErrorKind::Processing | ErrorKind::Network)
    }
}

impl PdfUtilError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PdfUtilError::ParseError(_) | PdfUtilError::Encrypted => ErrorKind::Parse,
            PdfUtilError::ValidationError(_) | PdfUtilError::InvalidRange(_) => {
                ErrorKind::Validation
            }
            PdfUtilError::ProcessingError(_) => ErrorKind::Processing,
            PdfUtilError::NetworkError(_) => ErrorKind::Network,
        }
    }

    /// Resolve the error to the single message shown to the user.
    ///
    /// Parse failures never leak parser internals; validation and
    /// processing errors already carry the most specific message available.
    pub fn user_message(&self) -> String {
        match self {
            PdfUtilError::ParseError(_) => {
                "Could not read the PDF. Check that the file is correct.".to_string()
            }
            PdfUtilError::Encrypted => "Cannot process protected files.".to_string(),
            PdfUtilError::ValidationError(msg)
            | PdfUtilError::ProcessingError(msg)
            | PdfUtilError::NetworkError(msg) => msg.clone(),
            PdfUtilError::InvalidRange(msg) => format!("Invalid page range: {}", msg),
        }
    }
}
