//! Stateful PDF session management
//!
//! Holds the loaded documents and page selection in Rust; `execute` runs one
//! pipeline command and hands the artifacts back to JavaScript.

use pdfutil_core::{
    parse_ranges, run, Artifact, InputFile, PdfCommand, PdfDocument, PdfInfo, ProcessResult,
    Progress,
};
use wasm_bindgen::prelude::*;

/// A loaded document with its metadata
#[derive(Default)]
struct DocumentEntry {
    name: String,
    bytes: Vec<u8>,
    info: PdfInfo,
}

/// Session mode determines available operations
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// One document, split into single pages
    Split,
    /// Two or more documents, combined in order
    Merge,
    /// One document, converted to a spreadsheet
    Convert,
}

impl SessionMode {
    fn single_document(self) -> bool {
        matches!(self, SessionMode::Split | SessionMode::Convert)
    }
}

#[wasm_bindgen]
pub struct PdfUtilSession {
    mode: SessionMode,
    documents: Vec<DocumentEntry>,
    /// `None` splits every page
    selected_pages: Option<Vec<u32>>,
    progress_callback: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl PdfUtilSession {
    #[wasm_bindgen(constructor)]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            documents: Vec::new(),
            selected_pages: None,
            progress_callback: None,
        }
    }

    #[wasm_bindgen(getter)]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// Callback signature: (percent: number, total: number, message: string) => void
    #[wasm_bindgen(js_name = setProgressCallback)]
    pub fn set_progress_callback(&mut self, callback: js_sys::Function) {
        self.progress_callback = Some(callback);
    }

    fn add_document_internal(&mut self, name: &str, bytes: &[u8]) -> Result<PdfInfo, String> {
        if self.mode.single_document() && !self.documents.is_empty() {
            return Err(
                "This mode only allows one document. Remove existing document first.".to_string(),
            );
        }

        let info = PdfDocument::load(bytes)
            .map_err(|e| e.user_message())?
            .info();

        self.documents.push(DocumentEntry {
            name: name.to_string(),
            bytes: bytes.to_vec(),
            info: info.clone(),
        });

        Ok(info)
    }

    /// Returns document info on success
    #[wasm_bindgen(js_name = addDocument)]
    pub fn add_document(&mut self, name: &str, bytes: &[u8]) -> Result<JsValue, JsValue> {
        let info = self
            .add_document_internal(name, bytes)
            .map_err(|e| JsValue::from_str(&e))?;

        serde_wasm_bindgen::to_value(&info)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = removeDocument)]
    pub fn remove_document(&mut self, index: usize) -> Result<(), JsValue> {
        if index >= self.documents.len() {
            return Err(JsValue::from_str("Document index out of bounds"));
        }
        self.documents.remove(index);

        if self.documents.is_empty() {
            self.selected_pages = None;
        }

        Ok(())
    }

    fn reorder_internal(&mut self, new_order: &[usize]) -> Result<(), String> {
        if self.mode != SessionMode::Merge {
            return Err("Reorder only available in merge mode".to_string());
        }

        if new_order.len() != self.documents.len() {
            return Err("Invalid order: wrong number of indices".to_string());
        }

        let mut seen = vec![false; self.documents.len()];
        for &idx in new_order {
            if idx >= self.documents.len() {
                return Err("Invalid order: index out of bounds".to_string());
            }
            if seen[idx] {
                return Err("Invalid order: duplicate index".to_string());
            }
            seen[idx] = true;
        }

        let mut new_docs = Vec::with_capacity(self.documents.len());
        for &idx in new_order {
            new_docs.push(std::mem::take(&mut self.documents[idx]));
        }
        self.documents = new_docs;

        Ok(())
    }

    /// `new_order` lists current indices in the desired order
    #[wasm_bindgen(js_name = reorderDocuments)]
    pub fn reorder_documents(&mut self, new_order: &[usize]) -> Result<(), JsValue> {
        self.reorder_internal(new_order)
            .map_err(|e| JsValue::from_str(&e))
    }

    fn set_page_selection_internal(&mut self, range_str: &str) -> Result<(), String> {
        if self.mode != SessionMode::Split {
            return Err("Page selection only available in split mode".to_string());
        }
        if self.documents.is_empty() {
            return Err("No document loaded".to_string());
        }

        if range_str.trim().is_empty() {
            self.selected_pages = None;
            return Ok(());
        }

        let page_count = self.documents[0].info.page_count;
        let pages = parse_ranges(range_str, page_count).map_err(|e| e.user_message())?;
        self.selected_pages = Some(pages);
        Ok(())
    }

    /// Input: "1-3, 5, 8-10"; an empty string goes back to splitting every page
    #[wasm_bindgen(js_name = setPageSelection)]
    pub fn set_page_selection(&mut self, range_str: &str) -> Result<(), JsValue> {
        self.set_page_selection_internal(range_str)
            .map_err(|e| JsValue::from_str(&e))
    }

    #[wasm_bindgen(js_name = clearPageSelection)]
    pub fn clear_page_selection(&mut self) {
        self.selected_pages = None;
    }

    /// Selected pages; empty when every page will be split
    #[wasm_bindgen(js_name = getSelectedPages)]
    pub fn get_selected_pages(&self) -> Vec<u32> {
        self.selected_pages.clone().unwrap_or_default()
    }

    #[wasm_bindgen(js_name = getDocumentInfos)]
    pub fn get_document_infos(&self) -> Result<JsValue, JsValue> {
        let infos: Vec<_> = self
            .documents
            .iter()
            .map(|d| DocumentInfoJs {
                name: d.name.clone(),
                page_count: d.info.page_count,
                size_bytes: d.bytes.len(),
                version: d.info.version.clone(),
            })
            .collect();

        serde_wasm_bindgen::to_value(&infos)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))
    }

    #[wasm_bindgen(js_name = getTotalPageCount)]
    pub fn get_total_page_count(&self) -> u32 {
        self.documents.iter().map(|d| d.info.page_count).sum()
    }

    #[wasm_bindgen(js_name = getDocumentCount)]
    pub fn get_document_count(&self) -> usize {
        self.documents.len()
    }

    #[wasm_bindgen(js_name = canExecute)]
    pub fn can_execute(&self) -> bool {
        match self.mode {
            SessionMode::Split | SessionMode::Convert => !self.documents.is_empty(),
            SessionMode::Merge => self.documents.len() >= 2,
        }
    }

    /// Run the session's operation.
    ///
    /// Returns `{ artifacts: [{ fileName, mimeType, bytes }], metrics }`;
    /// failures reject with the user-facing message.
    pub fn execute(&self) -> Result<JsValue, JsValue> {
        let (result, events) = self.execute_internal()?;

        // Progress is collected during the run and replayed to the callback
        for (percent, message) in &events {
            self.report_progress(*percent, message);
        }

        if !result.success {
            let message = result.error.unwrap_or_default();
            return Err(JsValue::from_str(&message));
        }

        let artifacts = js_sys::Array::new();
        for artifact in &result.artifacts {
            artifacts.push(&artifact_to_js(artifact)?);
        }

        let output = js_sys::Object::new();
        js_sys::Reflect::set(&output, &"artifacts".into(), &artifacts)?;
        let metrics = serde_wasm_bindgen::to_value(&result.metrics)
            .map_err(|e| JsValue::from_str(&format!("Serialization error: {}", e)))?;
        js_sys::Reflect::set(&output, &"metrics".into(), &metrics)?;
        Ok(output.into())
    }
}

impl PdfUtilSession {
    fn command(&self) -> PdfCommand {
        let input = |entry: &DocumentEntry| InputFile::new(entry.name.clone(), entry.bytes.clone());

        match self.mode {
            SessionMode::Merge => PdfCommand::Merge {
                files: self.documents.iter().map(input).collect(),
            },
            SessionMode::Split => {
                let file = input(&self.documents[0]);
                match &self.selected_pages {
                    Some(pages) => PdfCommand::SplitSelected {
                        file,
                        pages: pages.clone(),
                    },
                    None => PdfCommand::SplitAll { file },
                }
            }
            SessionMode::Convert => PdfCommand::Convert {
                file: input(&self.documents[0]),
            },
        }
    }

    /// Run the command, collecting progress events instead of reporting them
    fn execute_internal(&self) -> Result<(ProcessResult, Vec<(u8, String)>), String> {
        if !self.can_execute() {
            return Err(match self.mode {
                SessionMode::Merge => "Select at least two PDF files to merge".to_string(),
                _ => "No document loaded".to_string(),
            });
        }

        let mut events = Vec::new();
        let result = {
            let mut progress =
                Progress::new(|percent, message| events.push((percent, message.to_string())));
            run(self.command(), &mut progress)
        };
        Ok((result, events))
    }

    fn report_progress(&self, percent: u8, message: &str) {
        if let Some(ref callback) = self.progress_callback {
            let this = JsValue::null();
            let _ = callback.call3(
                &this,
                &JsValue::from(percent),
                &JsValue::from(100u32),
                &JsValue::from_str(message),
            );
        }
    }
}

fn artifact_to_js(artifact: &Artifact) -> Result<JsValue, JsValue> {
    let object = js_sys::Object::new();
    js_sys::Reflect::set(
        &object,
        &"fileName".into(),
        &JsValue::from_str(&artifact.file_name),
    )?;
    js_sys::Reflect::set(
        &object,
        &"mimeType".into(),
        &JsValue::from_str(&artifact.mime_type),
    )?;
    let bytes = js_sys::Uint8Array::from(artifact.bytes.as_slice());
    js_sys::Reflect::set(&object, &"bytes".into(), &bytes)?;
    Ok(object.into())
}

/// Document info for JS serialization
#[derive(serde::Serialize)]
struct DocumentInfoJs {
    name: String,
    page_count: u32,
    size_bytes: usize,
    version: String,
}
