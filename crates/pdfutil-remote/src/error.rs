//! Error types for the remote services

use pdfutil_core::PdfUtilError;

#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("{0} service is not configured")]
    NotConfigured(&'static str),

    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RemoteError {
    /// Connection failures and timeouts, as opposed to a service answering
    /// with an error
    pub fn is_network(&self) -> bool {
        match self {
            RemoteError::Request(e) => e.is_connect() || e.is_timeout(),
            _ => false,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, RemoteError::Request(e) if e.is_timeout())
    }
}

impl From<RemoteError> for PdfUtilError {
    fn from(err: RemoteError) -> Self {
        match err {
            e if e.is_network() => PdfUtilError::NetworkError(e.to_string()),
            RemoteError::ApiError { message, .. } => PdfUtilError::ProcessingError(message),
            service @ RemoteError::NotConfigured(_) => {
                PdfUtilError::ValidationError(service.to_string())
            }
            other => PdfUtilError::ProcessingError(other.to_string()),
        }
    }
}
