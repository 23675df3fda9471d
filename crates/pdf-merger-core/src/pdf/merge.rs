//! Order-preserving concatenation of PDF documents.
//!
//! Each source is loaded, renumbered past the ids already in use and stripped
//! of its page tree. Pages keep their per-document order and are re-parented
//! under one new `Pages` node. Attributes a page inherits from its old tree
//! (`Resources`, `MediaBox`, `CropBox`, `Rotate`) are copied onto the page
//! before the tree is discarded.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::config::MergeConfig;
use crate::error::{Error, Result};

/// Page attributes inherited through the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// US Letter, used when no MediaBox is found anywhere in the tree
const DEFAULT_MEDIA_BOX: [i64; 4] = [0, 0, 612, 792];

/// Guard against cyclic `Parent` chains
const MAX_TREE_DEPTH: usize = 64;

enum PageEntry {
    Imported(ObjectId, Dictionary),
    Divider(Object),
}

/// Merge documents into one, pages in input order.
pub fn merge_documents<D: AsRef<[u8]>>(documents: &[D], config: &MergeConfig) -> Result<Vec<u8>> {
    if documents.is_empty() {
        return Err(Error::Lopdf("No documents to merge".to_string()));
    }

    let mut max_id: u32 = 1;
    let mut pages: Vec<PageEntry> = Vec::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut last_media_box: Option<Object> = None;

    for (i, bytes) in documents.iter().enumerate() {
        let mut doc = Document::load_mem(bytes.as_ref())
            .map_err(|e| Error::Lopdf(format!("Failed to load document {}: {}", i + 1, e)))?;

        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
        if page_ids.is_empty() {
            return Err(Error::Lopdf(format!("Document {} has no pages", i + 1)));
        }

        if config.divider_page
            && let Some(media_box) = last_media_box.take()
        {
            pages.push(PageEntry::Divider(media_box));
        }

        for page_id in page_ids {
            let page = flatten_page(&doc, page_id)?;
            last_media_box = page.get(b"MediaBox").ok().cloned();
            pages.push(PageEntry::Imported(page_id, page));
        }

        for (object_id, object) in doc.objects {
            match object.type_name().unwrap_or(b"") {
                b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
                _ => {
                    objects.insert(object_id, object);
                }
            }
        }
    }

    let mut document = Document::with_version("1.5");
    document.objects = objects;
    document.max_id = max_id;

    let pages_id = document.new_object_id();
    let mut kids = Vec::with_capacity(pages.len());

    for entry in pages {
        let (page_id, mut page) = match entry {
            PageEntry::Imported(page_id, page) => (page_id, page),
            PageEntry::Divider(media_box) => (document.new_object_id(), blank_page(media_box)),
        };
        page.set("Parent", Object::Reference(pages_id));
        document.objects.insert(page_id, Object::Dictionary(page));
        kids.push(Object::Reference(page_id));
    }

    let count = i64::try_from(kids.len()).unwrap_or(i64::MAX);
    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(count)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.new_object_id();
    let catalog = Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    document.objects.insert(catalog_id, Object::Dictionary(catalog));
    document.trailer.set("Root", Object::Reference(catalog_id));

    document.renumber_objects();
    if config.compress {
        document.compress();
    }

    let mut output = Vec::new();
    document
        .save_to(&mut output)
        .map_err(|e| Error::PdfSave(format!("Failed to save merged PDF: {e}")))?;

    Ok(output)
}

/// Clone a page dictionary with inherited attributes made explicit.
fn flatten_page(doc: &Document, page_id: ObjectId) -> Result<Dictionary> {
    let mut page = doc
        .get_dictionary(page_id)
        .map_err(|e| Error::Lopdf(format!("Failed to read page {page_id:?}: {e}")))?
        .clone();

    for key in INHERITABLE {
        if page.has(key) {
            continue;
        }
        if let Some(value) = inherited_attribute(doc, &page, key) {
            page.set(key.to_vec(), value);
        }
    }

    if !page.has(b"MediaBox") {
        page.set("MediaBox", default_media_box());
    }

    Ok(page)
}

fn inherited_attribute(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();

    for _ in 0..MAX_TREE_DEPTH {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

fn default_media_box() -> Object {
    Object::Array(DEFAULT_MEDIA_BOX.iter().map(|&v| Object::Integer(v)).collect())
}

fn blank_page(media_box: Object) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Page".to_vec())),
        ("MediaBox", media_box),
        ("Resources", Object::Dictionary(Dictionary::new())),
    ])
}

// =============================================================================
// Tests
// =============================================================================
