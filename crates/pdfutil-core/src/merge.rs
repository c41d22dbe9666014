//! PDF Merge algorithm
//!
//! Combines multiple PDFs into a single document without re-encoding any
//! page content.

use crate::document::PdfDocument;
use crate::error::PdfUtilError;
use crate::fonts::inherited;
use crate::progress::Progress;
use lopdf::{Document, Object, ObjectId};

/// Page attributes a page may inherit from its ancestors
pub(crate) const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Merge multiple PDFs into one
///
/// The algorithm:
/// 1. Fewer than two inputs is a validation error
/// 2. Load every input (parse errors name the offending document)
/// 3. Use the first document as the destination
/// 4. For each further document:
///    a. Copy inherited attributes onto each page
///    b. Renumber its objects past the destination's highest id
///    c. Append its pages, in order, to the destination page list
/// 5. Flatten the page tree under the destination root, prune, serialize
pub fn merge_documents(documents: Vec<Vec<u8>>) -> Result<Vec<u8>, PdfUtilError> {
    merge_documents_with_progress(documents, &mut Progress::silent())
}

/// Same as [`merge_documents`], reporting 10..90 while documents are folded in
pub fn merge_documents_with_progress(
    documents: Vec<Vec<u8>>,
    progress: &mut Progress<'_>,
) -> Result<Vec<u8>, PdfUtilError> {
    if documents.len() < 2 {
        return Err(PdfUtilError::ValidationError(
            "Select at least two PDF files to merge".into(),
        ));
    }

    let total = documents.len();
    tracing::info!(documents = total, "Merging PDFs");
    progress.report(10.0, "Preparing documents...");

    let mut loaded = Vec::with_capacity(total);
    for (i, bytes) in documents.iter().enumerate() {
        let doc = PdfDocument::load(bytes).map_err(|e| match e {
            PdfUtilError::ParseError(msg) => {
                PdfUtilError::ParseError(format!("Failed to load document {}: {}", i + 1, msg))
            }
            other => other,
        })?;
        loaded.push(doc.into_inner());
    }

    let mut iter = loaded.into_iter();
    let Some(mut dest) = iter.next() else {
        return Err(PdfUtilError::ValidationError("No documents to merge".into()));
    };
    let mut dest_page_refs = prepare_pages(&mut dest);
    let mut dest_max_id = dest.max_id;
    progress.report_step(10.0, 80.0, 1, total, "Merging...");

    for (i, mut source) in iter.enumerate() {
        let source_pages = prepare_pages(&mut source);
        let id_offset = dest_max_id;

        for (old_id, object) in std::mem::take(&mut source.objects) {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        dest_page_refs.extend(source_pages.iter().map(|id| (id.0 + id_offset, id.1)));
        dest_max_id = dest_max_id.max(source.max_id + id_offset);

        tracing::debug!(
            document = i + 2,
            pages = source_pages.len(),
            "Appended document"
        );
        progress.report_step(10.0, 80.0, i + 2, total, "Merging...");
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;
    dest.prune_objects();

    let mut buffer = Vec::new();
    dest.save_to(&mut buffer).map_err(|e| {
        PdfUtilError::ProcessingError(format!("Failed to save merged PDF: {}", e))
    })?;
    progress.report(90.0, "Finalizing...");

    tracing::info!(pages = dest_page_refs.len(), size = buffer.len(), "Merge complete");
    Ok(buffer)
}

/// Page ids in order, with inherited attributes copied onto each page so the
/// page survives being re-parented.
pub(crate) fn prepare_pages(doc: &mut Document) -> Vec<ObjectId> {
    let pages: Vec<ObjectId> = doc.get_pages().values().copied().collect();

    for &page_id in &pages {
        let missing: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|key| {
                doc.get_dictionary(page_id)
                    .map(|dict| !dict.has(key))
                    .unwrap_or(false)
            })
            .filter_map(|&key| inherited(doc, page_id, key).map(|value| (key, value.clone())))
            .collect();

        if let Ok(Object::Dictionary(dict)) = doc.get_object_mut(page_id) {
            for (key, value) in missing {
                dict.set(key, value);
            }
        }
    }

    pages
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(std::mem::replace(value, Object::Null), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}

/// Point the root page tree node at `page_refs`, in order, and re-parent
/// every page to it.
fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfUtilError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(|root| root.as_reference())
        .map_err(|_| PdfUtilError::ProcessingError("No Root in trailer".into()))?;

    let pages_id = doc
        .get_dictionary(catalog_id)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(|pages| pages.as_reference())
        .map_err(|_| PdfUtilError::ProcessingError("No Pages in catalog".into()))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => {
            return Err(PdfUtilError::ProcessingError(
                "Invalid pages dictionary".into(),
            ))
        }
    }

    for page_id in page_refs {
        if let Some(Object::Dictionary(page)) = doc.objects.get_mut(page_id) {
            page.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
