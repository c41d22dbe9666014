//! OCR delegate against local service doubles
//!
//! Run with: cargo test -p pdfutil-remote --test ocr_delegate

mod common;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine};
use calamine::{open_workbook_from_rs, Reader, Xlsx};
use common::{create_blank_pdf, init_tracing, recording_progress, spawn_service, unreachable_url};
use pdfutil_core::{ErrorKind, InputFile, PdfUtilError, Progress};
use pdfutil_remote::local_ocr::LOCAL_OCR_FAILED;
use pdfutil_remote::{LocalOcr, OcrDelegate, PageImage, PageRecognizer, RemoteError, ServiceConfig};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

/// Returns canned text per page and records which pages were asked for
#[derive(Clone, Default)]
struct ScriptedRecognizer {
    pages: Vec<&'static str>,
    calls: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedRecognizer {
    fn new(pages: Vec<&'static str>) -> Self {
        Self {
            pages,
            calls: Arc::default(),
        }
    }
}

impl PageRecognizer for ScriptedRecognizer {
    async fn recognize(&self, page: PageImage<'_>) -> Result<String, RemoteError> {
        self.calls.lock().unwrap().push(page.page_number);
        assert!(page.pdf_path.exists());
        assert_eq!(page.dpi, 144);
        assert_eq!(page.language, "por");
        Ok(self.pages[(page.page_number - 1) as usize].to_string())
    }
}

/// Always fails, as a missing binary would
struct BrokenRecognizer;

impl PageRecognizer for BrokenRecognizer {
    async fn recognize(&self, _page: PageImage<'_>) -> Result<String, RemoteError> {
        Err(RemoteError::Tool {
            tool: "tesseract",
            message: "not installed".into(),
        })
    }
}

fn config_for(url: String) -> ServiceConfig {
    ServiceConfig {
        ocr_api_url: Some(url),
        ..ServiceConfig::default()
    }
}

fn scanned_pdf(pages: u32) -> InputFile {
    InputFile::new("digitalizado.pdf", create_blank_pdf(pages))
}

fn sheet_rows(bytes: Vec<u8>, sheet: &str) -> Vec<Vec<String>> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
    let range = workbook.worksheet_range(sheet).unwrap();
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

fn ocr_service(process: Router) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .merge(process)
}

#[tokio::test]
async fn remote_success_relays_workbook() {
    init_tracing();
    let workbook = b"PK\x03\x04 remote workbook".to_vec();
    let encoded = STANDARD.encode(&workbook);
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(move || {
            let encoded = encoded.clone();
            async move {
                Json(json!({
                    "success": true,
                    "excel_base64": encoded,
                    "filename": "tabelas.xlsx"
                }))
            }
        }),
    ));
    let url = spawn_service(app).await;

    let recognizer = ScriptedRecognizer::new(vec!["unused"]);
    let delegate = OcrDelegate::with_recognizer(&config_for(url), recognizer.clone()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut progress = recording_progress(seen.clone());

    let artifact = delegate.ocr_to_sheet(&scanned_pdf(1), &mut progress).await.unwrap();

    assert_eq!(artifact.file_name, "tabelas.xlsx");
    assert_eq!(artifact.bytes, workbook);
    assert!(recognizer.calls.lock().unwrap().is_empty());
    assert_eq!(*seen.lock().unwrap(), vec![5, 10, 20, 90, 100]);
}

#[tokio::test]
async fn remote_success_without_filename_uses_source_name() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async {
            Json(json!({ "success": true, "excel_base64": STANDARD.encode(b"PK") }))
        }),
    ));
    let url = spawn_service(app).await;
    let delegate = OcrDelegate::with_recognizer(&config_for(url), ScriptedRecognizer::default())
        .unwrap();

    let artifact = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap();
    assert_eq!(artifact.file_name, "digitalizado_OCR.xlsx");
}

#[tokio::test]
async fn bad_gateway_is_surfaced_without_fallback() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async { (StatusCode::BAD_GATEWAY, "upstream crashed") }),
    ));
    let url = spawn_service(app).await;
    let recognizer = ScriptedRecognizer::new(vec!["a  b"]);
    let delegate = OcrDelegate::with_recognizer(&config_for(url), recognizer.clone()).unwrap();

    let err = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Processing);
    assert_eq!(
        err.user_message(),
        "Server error: the API could not process the file. Try again."
    );
    assert!(recognizer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn client_closed_status_means_timeout() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async { (StatusCode::from_u16(499).unwrap(), "") }),
    ));
    let url = spawn_service(app).await;
    let delegate = OcrDelegate::with_recognizer(&config_for(url), ScriptedRecognizer::default())
        .unwrap();

    let err = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap_err();
    assert!(err.user_message().starts_with("Timeout:"));
}

#[tokio::test]
async fn json_error_field_wins_over_status_text() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "PDF has no tables" })),
            )
        }),
    ));
    let url = spawn_service(app).await;
    let delegate = OcrDelegate::with_recognizer(&config_for(url), ScriptedRecognizer::default())
        .unwrap();

    let err = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap_err();
    assert!(matches!(err, PdfUtilError::ProcessingError(ref m) if m == "PDF has no tables"));
}

#[tokio::test]
async fn unreachable_service_falls_back_to_local_ocr() {
    init_tracing();
    let url = unreachable_url().await;
    let recognizer = ScriptedRecognizer::new(vec!["Relatorio\na  b\nc  d  e", "f"]);
    let delegate = OcrDelegate::with_recognizer(&config_for(url), recognizer.clone()).unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut progress = recording_progress(seen.clone());

    let artifact = delegate.ocr_to_sheet(&scanned_pdf(2), &mut progress).await.unwrap();

    assert_eq!(artifact.file_name, "digitalizado_OCR.xlsx");
    assert_eq!(*recognizer.calls.lock().unwrap(), vec![1, 2]);
    let rows = sheet_rows(artifact.bytes, "Dados do PDF (OCR)");
    assert_eq!(rows[0][0], "Relatorio");
    assert_eq!(rows[2], vec!["c", "d", "e"]);
    assert_eq!(rows[3][0], "f");

    let seen = seen.lock().unwrap();
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn unhealthy_service_falls_back() {
    let app = Router::new().route(
        "/health",
        get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
    );
    let url = spawn_service(app).await;
    let recognizer = ScriptedRecognizer::new(vec!["x  y"]);
    let delegate = OcrDelegate::with_recognizer(&config_for(url), recognizer.clone()).unwrap();

    delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap();
    assert_eq!(*recognizer.calls.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn unsuccessful_payload_falls_back() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async { Json(json!({ "success": false })) }),
    ));
    let url = spawn_service(app).await;
    let recognizer = ScriptedRecognizer::new(vec!["x  y"]);
    let delegate = OcrDelegate::with_recognizer(&config_for(url), recognizer.clone()).unwrap();

    delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap();
    assert_eq!(*recognizer.calls.lock().unwrap(), vec![1]);
}

#[tokio::test]
async fn processing_timeout_is_surfaced() {
    let app = ocr_service(Router::new().route(
        "/process-pdf",
        post(|| async {
            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
            Json(json!({ "success": true, "excel_base64": "" }))
        }),
    ));
    let url = spawn_service(app).await;
    let config = ServiceConfig {
        ocr_timeout_secs: 1,
        ..config_for(url)
    };
    let recognizer = ScriptedRecognizer::new(vec!["x  y"]);
    let delegate = OcrDelegate::with_recognizer(&config, recognizer.clone()).unwrap();

    let err = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Network);
    assert!(err.user_message().starts_with("Timeout: processing took longer than"));
    assert!(recognizer.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn local_ocr_pads_rows_to_widest() {
    let recognizer = ScriptedRecognizer::new(vec!["Relatorio\na  b\nc  d  e\nf"]);
    let local = LocalOcr::new(recognizer, &ServiceConfig::default());

    let grid = local
        .recognize_grid(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap();

    assert_eq!(grid.header, None);
    let widths: Vec<usize> = grid.rows.iter().map(Vec::len).collect();
    assert_eq!(widths, vec![3, 3, 3, 3]);
    assert_eq!(grid.rows[1], vec!["a", "b", ""]);
}

#[tokio::test]
async fn local_ocr_failure_has_generic_message() {
    let delegate =
        OcrDelegate::with_recognizer(&ServiceConfig::default(), BrokenRecognizer).unwrap();

    let err = delegate
        .ocr_to_sheet(&scanned_pdf(1), &mut Progress::silent())
        .await
        .unwrap_err();

    assert!(matches!(err, PdfUtilError::ProcessingError(ref m) if m == LOCAL_OCR_FAILED));
}
