//! Network-facing operations of the PDF utility pipeline
//!
//! - [`OcrDelegate`]: scanned PDF to spreadsheet through a remote
//!   table-extraction service, falling back once to local rasterization and
//!   recognition
//! - [`Compressor`]: remote compression when a service is configured, the
//!   in-process lossless pass otherwise
//! - [`TiffConverter`]: TIFF to PDF through a remote service
//!
//! Service locations come from [`ServiceConfig`], resolved once per process.

pub mod client;
pub mod compress;
pub mod config;
pub mod error;
pub mod local_ocr;
pub mod ocr;
pub mod tiff;

pub use compress::{Compressor, RemoteCompressor};
pub use config::ServiceConfig;
pub use error::RemoteError;
pub use local_ocr::{LocalOcr, PageImage, PageRecognizer, TesseractRecognizer};
pub use ocr::OcrDelegate;
pub use tiff::{validate_tiff, TiffConverter, TiffInfo, MAX_TIFF_BYTES};
