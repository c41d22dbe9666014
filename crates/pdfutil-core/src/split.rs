//! PDF Split algorithm
//!
//! Each output copies one page and only the objects that page reaches into
//! a fresh document under a new page tree. Content streams are never
//! re-encoded, so a given input always yields the same bytes.

use crate::artifact::Artifact;
use crate::document::PdfDocument;
use crate::error::PdfUtilError;
use crate::fonts::inherited;
use crate::merge::INHERITABLE;
use crate::naming::page_file_name;
use crate::progress::Progress;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeSet;

/// One single-page document per page, in page order
pub fn split_all(
    bytes: &[u8],
    source_name: &str,
    progress: &mut Progress<'_>,
) -> Result<Vec<Artifact>, PdfUtilError> {
    progress.report(10.0, "Loading PDF...");
    let doc = PdfDocument::load(bytes)?;
    let pages: Vec<u32> = (1..=doc.page_count() as u32).collect();
    progress.report(20.0, "Splitting pages...");

    extract_each(&doc, source_name, &pages, progress)
}

/// One single-page document per selected page number
///
/// Numbers outside `1..=page_count` are dropped, duplicates collapse and the
/// output follows ascending page order whatever order the selection had.
pub fn split_selected(
    bytes: &[u8],
    source_name: &str,
    selection: &[u32],
    progress: &mut Progress<'_>,
) -> Result<Vec<Artifact>, PdfUtilError> {
    progress.report(10.0, "Loading PDF...");
    let doc = PdfDocument::load(bytes)?;
    let page_count = doc.page_count() as u32;

    let pages: Vec<u32> = selection
        .iter()
        .copied()
        .filter(|n| (1..=page_count).contains(n))
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect();

    if pages.is_empty() {
        return Err(PdfUtilError::ValidationError(
            "no valid pages selected".into(),
        ));
    }
    if pages.len() < selection.len() {
        tracing::debug!(
            requested = selection.len(),
            kept = pages.len(),
            page_count,
            "Dropped out-of-range or repeated pages"
        );
    }
    progress.report(20.0, "Splitting pages...");

    extract_each(&doc, source_name, &pages, progress)
}

/// Single-page document holding page `number` (1-indexed)
pub fn extract_page(doc: &PdfDocument, number: u32) -> Result<Vec<u8>, PdfUtilError> {
    let page_count = doc.page_count() as u32;
    if number == 0 || number > page_count {
        return Err(PdfUtilError::InvalidRange(format!(
            "Page {} does not exist (document has {} pages)",
            number, page_count
        )));
    }
    let page = doc.page(number as usize - 1)?;
    single_page_document(doc.inner(), page.id)
}

fn extract_each(
    doc: &PdfDocument,
    source_name: &str,
    pages: &[u32],
    progress: &mut Progress<'_>,
) -> Result<Vec<Artifact>, PdfUtilError> {
    tracing::info!(source = source_name, pages = pages.len(), "Splitting PDF");

    let mut artifacts = Vec::with_capacity(pages.len());
    for (i, &number) in pages.iter().enumerate() {
        let bytes = extract_page(doc, number)?;
        tracing::debug!(page = number, size = bytes.len(), "Extracted page");
        artifacts.push(Artifact::pdf(page_file_name(source_name, number), bytes));
        progress.report_step(20.0, 70.0, i + 1, pages.len(), "Splitting pages...");
    }

    Ok(artifacts)
}

fn single_page_document(source: &Document, page_id: ObjectId) -> Result<Vec<u8>, PdfUtilError> {
    let mut page = source
        .get_dictionary(page_id)
        .map_err(|e| PdfUtilError::ProcessingError(format!("Invalid page object: {}", e)))?
        .clone();
    for key in INHERITABLE {
        if !page.has(key) {
            if let Some(value) = inherited(source, page_id, key) {
                page.set(key, value.clone());
            }
        }
    }
    page.remove(b"Parent");

    let mut doc = Document::with_version(source.version.clone());
    for id in reachable_objects(source, page_id, &page) {
        if let Some(object) = source.objects.get(&id) {
            doc.objects.insert(id, object.clone());
        }
    }

    // Fresh ids go past the source's so copied references stay valid
    doc.max_id = source.max_id;
    let pages_id = doc.new_object_id();
    page.set("Parent", Object::Reference(pages_id));
    doc.objects.insert(page_id, Object::Dictionary(page));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![Object::Reference(page_id)])),
            ("Count", Object::Integer(1)),
        ])),
    );
    let catalog_id = doc.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| PdfUtilError::ProcessingError(format!("Save failed: {}", e)))?;

    Ok(buffer)
}

/// Objects referenced from `page`, directly or indirectly, other than the
/// page itself. Other page tree nodes are not entered.
fn reachable_objects(source: &Document, page_id: ObjectId, page: &Dictionary) -> BTreeSet<ObjectId> {
    let mut reached = BTreeSet::new();
    let mut pending = Vec::new();
    push_dict_refs(page, &mut pending);

    while let Some(id) = pending.pop() {
        if id == page_id || reached.contains(&id) || is_page_tree_node(source, id) {
            continue;
        }
        reached.insert(id);
        if let Some(object) = source.objects.get(&id) {
            push_refs(object, &mut pending);
        }
    }

    reached
}

fn is_page_tree_node(doc: &Document, id: ObjectId) -> bool {
    matches!(
        doc.get_dictionary(id).and_then(|dict| dict.get(b"Type")),
        Ok(Object::Name(name)) if name == b"Page" || name == b"Pages"
    )
}

fn push_refs(object: &Object, pending: &mut Vec<ObjectId>) {
    match object {
        Object::Reference(id) => pending.push(*id),
        Object::Array(items) => items.iter().for_each(|item| push_refs(item, pending)),
        Object::Dictionary(dict) => push_dict_refs(dict, pending),
        Object::Stream(stream) => push_dict_refs(&stream.dict, pending),
        _ => {}
    }
}

fn push_dict_refs(dict: &Dictionary, pending: &mut Vec<ObjectId>) {
    for (_, value) in dict.iter() {
        push_refs(value, pending);
    }
}
