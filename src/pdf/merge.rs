//! PDF merge
//!
//! Concatenates the pages of several files into one. Editing state plays
//! no part here; the result is an ordinary new document.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use lopdf::{Document, Object, ObjectId};

use super::error::PdfError;
use super::stamp::inherited_attribute;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Merge `inputs` in order and write the result to `output`
pub fn merge_files(inputs: &[PathBuf], output: &Path) -> Result<(), PdfError> {
    if inputs.is_empty() {
        return Err(PdfError::generic("No documents to merge"));
    }

    let mut documents = Vec::with_capacity(inputs.len());
    for path in inputs {
        let doc = Document::load(path)
            .map_err(|e| PdfError::generic(format!("Failed to load {}: {e}", path.display())))?;
        documents.push(doc);
    }

    let mut merged = merge_documents(documents)?;
    merged
        .save(output)
        .map_err(|e| PdfError::io(output, e))?;

    info!("Merged {} files into {output:?}", inputs.len());
    Ok(())
}

/// Merge loaded documents, the first one becomes the destination
///
/// Object ids of every following document are shifted past the current
/// maximum, then its pages are appended to the destination page tree.
/// Pages are re-parented onto a single `/Pages` node, so attributes they
/// inherited from their old ancestors are copied onto them first.
pub fn merge_documents(documents: Vec<Document>) -> Result<Document, PdfError> {
    let mut documents = documents.into_iter();
    let Some(mut dest) = documents.next() else {
        return Err(PdfError::generic("No documents to merge"));
    };
    pin_inherited_attributes(&mut dest);

    let mut dest_page_refs = page_references(&dest);
    let mut dest_max_id = dest.max_id;

    for mut source in documents {
        pin_inherited_attributes(&mut source);
        let source_pages = page_references(&source);
        let id_offset = dest_max_id;

        for (old_id, object) in source.objects {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }

        dest_page_refs.extend(
            source_pages
                .into_iter()
                .map(|(num, generation)| (num + id_offset, generation)),
        );
        dest_max_id = dest_max_id.max(source.max_id + id_offset);
    }

    dest.max_id = dest_max_id;
    update_page_tree(&mut dest, &dest_page_refs)?;
    dest.compress();

    Ok(dest)
}

/// Copy inheritable page attributes the page does not set itself
fn pin_inherited_attributes(doc: &mut Document) {
    for page_id in page_references(doc) {
        let Ok(own) = doc.get_dictionary(page_id) else {
            continue;
        };
        let inherited: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter(|&&key| !own.has(key))
            .filter_map(|&key| inherited_attribute(doc, page_id, key).map(|value| (key, value)))
            .collect();
        if inherited.is_empty() {
            continue;
        }

        debug!("Pinning {} inherited attributes on page {page_id:?}", inherited.len());
        if let Ok(Object::Dictionary(page)) = doc.get_object_mut(page_id) {
            for (key, value) in inherited {
                page.set(key, value);
            }
        }
    }
}

fn page_references(doc: &Document) -> Vec<ObjectId> {
    // BTreeMap keyed by page number keeps document order
    let pages: BTreeMap<u32, ObjectId> = doc.get_pages();
    pages.into_values().collect()
}

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

fn update_page_tree(doc: &mut Document, page_refs: &[ObjectId]) -> Result<(), PdfError> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| PdfError::generic("Trailer has no Root reference"))?;

    let pages_id = doc
        .get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| PdfError::generic("Catalog has no Pages reference"))?;

    match doc.objects.get_mut(&pages_id) {
        Some(Object::Dictionary(pages_dict)) => {
            let kids = page_refs.iter().map(|&id| Object::Reference(id)).collect();
            pages_dict.set("Kids", Object::Array(kids));
            pages_dict.set("Count", Object::Integer(page_refs.len() as i64));
        }
        _ => return Err(PdfError::generic("Invalid pages dictionary")),
    }

    for page_id in page_refs {
        if let Some(Object::Dictionary(page_dict)) = doc.objects.get_mut(page_id) {
            page_dict.set("Parent", Object::Reference(pages_id));
        }
    }

    Ok(())
}
