//! WASM bindings for the PDF utility pipeline
//!
//! Documents and page selections live in a Rust-side session; JavaScript only
//! handles DOM events, file I/O and downloads.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { PdfUtilSession, SessionMode } from './pkg/pdfutil_wasm.js';
//!
//! await init();
//!
//! // Split mode: every page, or a selection
//! const session = new PdfUtilSession(SessionMode.Split);
//! session.setProgressCallback((percent, total, msg) => updateUI(percent, msg));
//! session.addDocument("file.pdf", bytes);
//! session.setPageSelection("1-3, 5");
//! const { artifacts } = session.execute();
//! artifacts.forEach(a => downloadBlob(a.bytes, a.fileName, a.mimeType));
//!
//! // Merge mode
//! const session = new PdfUtilSession(SessionMode.Merge);
//! session.addDocument("a.pdf", bytesA);
//! session.addDocument("b.pdf", bytesB);
//! session.reorderDocuments([1, 0]);
//! const { artifacts } = session.execute();
//! ```

pub mod session;

use wasm_bindgen::prelude::*;

pub use session::{PdfUtilSession, SessionMode};

/// Called automatically by wasm-bindgen
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Header and `%%EOF` check without a full parse
#[wasm_bindgen]
pub fn quick_validate(bytes: &[u8]) -> Result<(), JsValue> {
    pdfutil_core::quick_validate(bytes).map_err(|e| JsValue::from_str(&e.user_message()))
}

/// Page count, version and metadata, for showing a file before any operation
#[wasm_bindgen]
pub fn get_pdf_info(bytes: &[u8]) -> Result<JsValue, JsValue> {
    let info = pdfutil_core::PdfDocument::load(bytes)
        .map_err(|e| JsValue::from_str(&e.user_message()))?
        .info();

    serde_wasm_bindgen::to_value(&info)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
}

#[wasm_bindgen]
pub fn get_page_count(bytes: &[u8]) -> Result<u32, JsValue> {
    pdfutil_core::get_page_count(bytes).map_err(|e| JsValue::from_str(&e.user_message()))
}

/// Format bytes as human-readable string
#[wasm_bindgen]
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}
