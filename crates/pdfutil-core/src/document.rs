//! Document handle loading
//!
//! Opens raw bytes as a parsed PDF and exposes page count and page lookup.
//! Encrypted documents are rejected here so every operation downstream can
//! assume readable content streams.

use crate::error::PdfUtilError;
use lopdf::{Document, ObjectId};
use serde::Serialize;

/// One page of a loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    /// Zero-based position in the document
    pub index: usize,
    /// One-based page number
    pub number: u32,
    /// Page dictionary object id
    pub id: ObjectId,
}

/// PDF file information extracted while loading
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct PdfInfo {
    /// Number of pages in the document
    pub page_count: u32,
    /// PDF version string (e.g., "1.7")
    pub version: String,
    /// Whether the document is encrypted
    pub encrypted: bool,
    /// File size in bytes
    pub size_bytes: usize,
    /// Document title from metadata (if available)
    pub title: Option<String>,
    /// Document author from metadata (if available)
    pub author: Option<String>,
}

/// A parsed document owned by a single operation
#[derive(Debug)]
pub struct PdfDocument {
    inner: Document,
    pages: Vec<ObjectId>,
    size_bytes: usize,
    version: String,
}

impl PdfDocument {
    /// Parse a byte buffer.
    ///
    /// Fails with `ParseError` for anything that is not a readable PDF and
    /// with `Encrypted` for password-protected files.
    pub fn load(bytes: &[u8]) -> Result<Self, PdfUtilError> {
        if bytes.is_empty() {
            return Err(PdfUtilError::ParseError("Empty file".into()));
        }
        if !bytes.starts_with(b"%PDF-") {
            return Err(PdfUtilError::ParseError(
                "Not a valid PDF file (missing %PDF- header)".into(),
            ));
        }

        let inner =
            Document::load_mem(bytes).map_err(|e| PdfUtilError::ParseError(e.to_string()))?;

        if inner.is_encrypted() {
            return Err(PdfUtilError::Encrypted);
        }

        let pages: Vec<ObjectId> = inner.get_pages().values().copied().collect();
        if pages.is_empty() {
            return Err(PdfUtilError::ParseError("PDF has no pages".into()));
        }

        tracing::debug!(pages = pages.len(), size = bytes.len(), "Loaded PDF");

        Ok(Self {
            inner,
            pages,
            size_bytes: bytes.len(),
            version: extract_version(bytes),
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Look up a page by zero-based index
    pub fn page(&self, index: usize) -> Result<PageRef, PdfUtilError> {
        let id = self.pages.get(index).copied().ok_or_else(|| {
            PdfUtilError::ValidationError(format!(
                "Page index {} out of range (document has {} pages)",
                index,
                self.pages.len()
            ))
        })?;
        Ok(PageRef {
            index,
            number: index as u32 + 1,
            id,
        })
    }

    pub fn pages(&self) -> impl Iterator<Item = PageRef> + '_ {
        self.pages.iter().enumerate().map(|(index, &id)| PageRef {
            index,
            number: index as u32 + 1,
            id,
        })
    }

    pub fn inner(&self) -> &Document {
        &self.inner
    }

    pub fn into_inner(self) -> Document {
        self.inner
    }

    pub fn info(&self) -> PdfInfo {
        let (title, author) = extract_metadata(&self.inner);
        PdfInfo {
            page_count: self.pages.len() as u32,
            version: self.version.clone(),
            encrypted: false,
            size_bytes: self.size_bytes,
            title,
            author,
        }
    }
}

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<u32, PdfUtilError> {
    Ok(PdfDocument::load(bytes)?.page_count() as u32)
}

/// Quick validation without full parsing (for large files)
pub fn quick_validate(bytes: &[u8]) -> Result<(), PdfUtilError> {
    if bytes.len() < 8 {
        return Err(PdfUtilError::ParseError(
            "File too small to be a valid PDF".into(),
        ));
    }

    if !bytes.starts_with(b"%PDF-") {
        return Err(PdfUtilError::ParseError(
            "Not a valid PDF file (missing %PDF- header)".into(),
        ));
    }

    // %%EOF should be near the end
    let tail = if bytes.len() > 1024 {
        &bytes[bytes.len() - 1024..]
    } else {
        bytes
    };

    if !tail.windows(5).any(|w| w == b"%%EOF") {
        return Err(PdfUtilError::ParseError(
            "PDF appears truncated (missing %%EOF marker)".into(),
        ));
    }

    Ok(())
}

/// Extract PDF version from header
fn extract_version(bytes: &[u8]) -> String {
    // Header format: %PDF-1.7
    if bytes.len() >= 8 && bytes.starts_with(b"%PDF-") {
        if let Ok(version) = std::str::from_utf8(&bytes[5..8]) {
            return version.trim().to_string();
        }
    }
    "1.4".to_string()
}

fn extract_metadata(document: &Document) -> (Option<String>, Option<String>) {
    let info = document
        .trailer
        .get(b"Info")
        .and_then(|obj| obj.as_reference())
        .and_then(|id| document.get_dictionary(id));

    let Ok(info) = info else {
        return (None, None);
    };

    let read = |key: &[u8]| {
        info.get(key)
            .and_then(|obj| obj.as_str())
            .ok()
            .map(|bytes| crate::fonts::decode_text_string(bytes))
            .filter(|s| !s.is_empty())
    };

    (read(b"Title"), read(b"Author"))
}
