//! Document model on top of lopdf
//!
//! `SourceDocument` is a read-only parsed input. `OutputDocument` is the
//! document being built by one operation: pages are copied or created into it
//! and it is consumed by `serialize`.

use crate::error::{PdfToolsError, Result};
use crate::layout::{ImagePlacement, PageSize};
use crate::raster::{self, ImageFormat, RasterImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A parsed, immutable input document
#[derive(Debug)]
pub struct SourceDocument {
    document: Document,
    pages: Vec<ObjectId>,
}

impl SourceDocument {
    /// Parse PDF bytes. Password-protected documents are rejected.
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let document =
            Document::load_mem(bytes).map_err(|e| PdfToolsError::Parse(e.to_string()))?;

        if document.is_encrypted() {
            return Err(PdfToolsError::Parse(
                "Document is password protected".into(),
            ));
        }

        let pages = document.get_pages().into_values().collect();
        Ok(Self { document, pages })
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(crate) fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.pages.get(index).copied()
    }

    pub(crate) fn inner(&self) -> &Document {
        &self.document
    }

    /// Re-save the whole document, catalog and trailer entries included.
    ///
    /// Object streams are written back as plain objects with a classic
    /// cross-reference table.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let mut document = self.document.clone();
        for key in XREF_STREAM_KEYS {
            document.trailer.remove(key);
        }
        document.objects.retain(|_, object| {
            !matches!(
                object.as_stream().and_then(|s| s.dict.get(b"Type")),
                Ok(Object::Name(kind)) if kind.as_slice() == b"ObjStm" || kind.as_slice() == b"XRef"
            )
        });

        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| PdfToolsError::Internal(format!("Save failed: {}", e)))?;
        Ok(buffer)
    }
}

/// Trailer entries that only describe a cross-reference stream
const XREF_STREAM_KEYS: [&[u8]; 8] = [
    b"Type",
    b"W",
    b"Index",
    b"Filter",
    b"DecodeParms",
    b"Length",
    b"Prev",
    b"XRefStm",
];

/// Handle to a page object owned by an `OutputDocument`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageId(ObjectId);

/// Handle to an image XObject embedded in an `OutputDocument`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmbeddedImage {
    id: ObjectId,
    pub width: u32,
    pub height: u32,
}

/// The document under construction
#[derive(Debug)]
pub struct OutputDocument {
    document: Document,
    pages_id: ObjectId,
    pages: Vec<ObjectId>,
    image_count: usize,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    /// Create an empty document
    pub fn new() -> Self {
        let mut document = Document::with_version("1.7");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            pages: Vec::new(),
            image_count: 0,
        }
    }

    /// Pages appended so far
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Copy pages of `source` into this document without appending them.
    ///
    /// Each page and everything it references is deep-copied with fresh
    /// object ids. Objects shared between pages of the batch are copied
    /// once. References to pages outside the batch are cut to null.
    pub fn copy_pages(&mut self, source: &SourceDocument, indices: &[usize]) -> Result<Vec<PageId>> {
        let mut page_ids = Vec::with_capacity(indices.len());
        for &index in indices {
            let page_id = source.page_id(index).ok_or_else(|| {
                PdfToolsError::Validation(format!(
                    "Page index {} is out of range (document has {} pages)",
                    index,
                    source.page_count()
                ))
            })?;
            page_ids.push(page_id);
        }

        // Reserve targets for every page first so links between them survive
        let mut imported: HashMap<ObjectId, ObjectId> = HashMap::new();
        for &page_id in &page_ids {
            if !imported.contains_key(&page_id) {
                let new_id = self.document.new_object_id();
                imported.insert(page_id, new_id);
            }
        }

        let mut copied = Vec::with_capacity(page_ids.len());
        let mut placed: HashSet<ObjectId> = HashSet::new();
        for page_id in page_ids {
            // A page selected twice gets a second page object sharing its resources
            let target = if placed.insert(page_id) {
                imported[&page_id]
            } else {
                self.document.new_object_id()
            };
            let dict = self.import_page(source.inner(), page_id, &mut imported)?;
            self.document.objects.insert(target, Object::Dictionary(dict));
            copied.push(PageId(target));
        }

        Ok(copied)
    }

    /// Append a page to the end of the page list
    pub fn append_page(&mut self, page: PageId) {
        self.pages.push(page.0);
    }

    /// Create a blank page of the given size without appending it
    pub fn create_page(&mut self, size: PageSize) -> PageId {
        let page = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            (
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(size.width as f32),
                    Object::Real(size.height as f32),
                ]),
            ),
            ("Resources", Object::Dictionary(Dictionary::new())),
        ]);
        PageId(self.document.add_object(page))
    }

    /// Embed image bytes as an image XObject.
    ///
    /// Fails with `UnsupportedFormat` when the bytes do not decode as `format`.
    pub fn embed_image(&mut self, bytes: &[u8], format: ImageFormat) -> Result<EmbeddedImage> {
        let image = raster::decode(bytes, format)?;
        Ok(self.embed_raster(image))
    }

    fn embed_raster(&mut self, image: RasterImage) -> EmbeddedImage {
        let mut dict = image_dictionary(image.width, image.height, image.color_space, image.filter);
        if let Some(decode) = image.decode {
            dict.set(
                "Decode",
                Object::Array(decode.into_iter().map(Object::Integer).collect()),
            );
        }

        if let Some(alpha) = image.alpha {
            let mask = image_dictionary(image.width, image.height, "DeviceGray", "FlateDecode");
            let mask_id = self
                .document
                .add_object(Stream::new(mask, alpha).with_compression(false));
            dict.set("SMask", Object::Reference(mask_id));
        }

        let id = self
            .document
            .add_object(Stream::new(dict, image.data).with_compression(false));

        EmbeddedImage {
            id,
            width: image.width,
            height: image.height,
        }
    }

    /// Paint an embedded image onto a page at the given placement
    pub fn draw_image(
        &mut self,
        page: PageId,
        image: &EmbeddedImage,
        placement: &ImagePlacement,
    ) -> Result<()> {
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);

        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        Object::Real(placement.rendered_width as f32),
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(placement.rendered_height as f32),
                        Object::Real(placement.offset_x as f32),
                        Object::Real(placement.offset_y as f32),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(name.clone().into_bytes())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = self
            .document
            .add_object(Stream::new(Dictionary::new(), content.encode()?));

        let page_dict = match self.document.objects.get_mut(&page.0) {
            Some(Object::Dictionary(dict)) => dict,
            _ => {
                return Err(PdfToolsError::Internal(format!(
                    "Page {:?} is not a page dictionary",
                    page.0
                )))
            }
        };

        let mut resources = match page_dict.get(b"Resources") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        let mut xobjects = match resources.get(b"XObject") {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };
        xobjects.set(name.into_bytes(), Object::Reference(image.id));
        resources.set("XObject", Object::Dictionary(xobjects));
        page_dict.set("Resources", Object::Dictionary(resources));

        let contents = match page_dict.get(b"Contents") {
            Ok(Object::Array(items)) => {
                let mut items = items.clone();
                items.push(Object::Reference(content_id));
                Object::Array(items)
            }
            Ok(existing @ Object::Reference(_)) => {
                Object::Array(vec![existing.clone(), Object::Reference(content_id)])
            }
            _ => Object::Reference(content_id),
        };
        page_dict.set("Contents", contents);

        Ok(())
    }

    /// Write the page tree and serialize the document
    pub fn serialize(self) -> Result<Vec<u8>> {
        let OutputDocument {
            mut document,
            pages_id,
            pages,
            ..
        } = self;

        for page_id in &pages {
            if let Some(Object::Dictionary(dict)) = document.objects.get_mut(page_id) {
                dict.set("Parent", Object::Reference(pages_id));
            }
        }

        let page_tree = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Count", Object::Integer(pages.len() as i64)),
            (
                "Kids",
                Object::Array(pages.iter().map(|&id| Object::Reference(id)).collect()),
            ),
        ]);
        document
            .objects
            .insert(pages_id, Object::Dictionary(page_tree));

        let catalog = Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]);
        let catalog_id = document.add_object(catalog);
        document.trailer.set("Root", Object::Reference(catalog_id));

        document.compress();

        let mut buffer = Vec::new();
        document
            .save_to(&mut buffer)
            .map_err(|e| PdfToolsError::Internal(format!("Save failed: {}", e)))?;

        Ok(buffer)
    }

    fn import_page(
        &mut self,
        source: &Document,
        page_id: ObjectId,
        imported: &mut HashMap<ObjectId, ObjectId>,
    ) -> Result<Dictionary> {
        let page = match source.get_object(page_id)? {
            Object::Dictionary(dict) => dict,
            _ => {
                return Err(PdfToolsError::Internal(format!(
                    "Page object {:?} is not a dictionary",
                    page_id
                )))
            }
        };

        let mut flattened = page.clone();
        flattened.remove(b"Parent");
        for key in INHERITABLE_KEYS {
            if !flattened.has(key) {
                if let Some(value) = inherited_attribute(source, page, key) {
                    flattened.set(key.to_vec(), value.clone());
                }
            }
        }
        if !flattened.has(b"MediaBox") {
            let letter = PageSize::LETTER;
            flattened.set(
                "MediaBox",
                Object::Array(vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Real(letter.width as f32),
                    Object::Real(letter.height as f32),
                ]),
            );
        }

        Ok(self.import_dictionary(source, &flattened, imported))
    }

    fn import_object(
        &mut self,
        source: &Document,
        object: &Object,
        imported: &mut HashMap<ObjectId, ObjectId>,
    ) -> Object {
        match object {
            Object::Reference(id) => self.import_reference(source, *id, imported),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.import_object(source, item, imported))
                    .collect(),
            ),
            Object::Dictionary(dict) => {
                Object::Dictionary(self.import_dictionary(source, dict, imported))
            }
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.import_dictionary(source, &stream.dict, imported);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn import_dictionary(
        &mut self,
        source: &Document,
        dict: &Dictionary,
        imported: &mut HashMap<ObjectId, ObjectId>,
    ) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            let value = self.import_object(source, value, imported);
            copy.set(key.clone(), value);
        }
        copy
    }

    fn import_reference(
        &mut self,
        source: &Document,
        id: ObjectId,
        imported: &mut HashMap<ObjectId, ObjectId>,
    ) -> Object {
        if let Some(&new_id) = imported.get(&id) {
            return Object::Reference(new_id);
        }

        let Ok(target) = source.get_object(id) else {
            // Dangling reference
            return Object::Null;
        };

        // Never drag the source page tree or unselected pages along
        if let Object::Dictionary(dict) = target {
            if let Ok(Object::Name(kind)) = dict.get(b"Type") {
                if kind.as_slice() == b"Pages" || kind.as_slice() == b"Page" {
                    return Object::Null;
                }
            }
        }

        let new_id = self.document.new_object_id();
        imported.insert(id, new_id);
        let copy = self.import_object(source, target, imported);
        self.document.objects.insert(new_id, copy);
        Object::Reference(new_id)
    }
}

fn image_dictionary(width: u32, height: u32, color_space: &str, filter: &str) -> Dictionary {
    Dictionary::from_iter(vec![
        ("Type", Object::Name(b"XObject".to_vec())),
        ("Subtype", Object::Name(b"Image".to_vec())),
        ("Width", Object::Integer(width as i64)),
        ("Height", Object::Integer(height as i64)),
        ("ColorSpace", Object::Name(color_space.as_bytes().to_vec())),
        (
            "BitsPerComponent",
            Object::Integer(RasterImage::BITS_PER_COMPONENT),
        ),
        ("Filter", Object::Name(filter.as_bytes().to_vec())),
    ])
}

/// Walk up the page tree looking for an inheritable attribute
pub(crate) fn inherited_attribute<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut visited = HashSet::new();
    let mut node = page;
    loop {
        let parent_id = node.get(b"Parent").ok()?.as_reference().ok()?;
        if !visited.insert(parent_id) {
            return None;
        }
        node = doc.get_object(parent_id).ok()?.as_dict().ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::layout::fit;
    use crate::raster::fixtures::{cmyk_jpeg_bytes, jpeg_bytes, png_bytes};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_rejects_garbage() {
        let err = SourceDocument::load(b"definitely not a pdf").unwrap_err();
        assert!(matches!(err, PdfToolsError::Parse(_)));
    }

    #[test]
    fn test_load_reports_page_count() {
        let doc = SourceDocument::load(&create_test_pdf(4, "A")).unwrap();
        assert_eq!(doc.page_count(), 4);
    }

    #[test]
    fn test_empty_output_serializes() {
        let bytes = OutputDocument::new().serialize().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 0);
    }

    #[test]
    fn test_copy_pages_keeps_content_and_inherited_attributes() {
        let source = SourceDocument::load(&create_test_pdf(3, "Src")).unwrap();
        let mut output = OutputDocument::new();
        for page in output.copy_pages(&source, &[2, 0]).unwrap() {
            output.append_page(page);
        }
        let bytes = output.serialize().unwrap();

        assert_eq!(page_labels(&bytes), vec!["Src-Page-3", "Src-Page-1"]);

        let doc = Document::load_mem(&bytes).unwrap();
        for page_id in doc.get_pages().into_values() {
            let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
            assert!(page.has(b"MediaBox"));
            assert!(page.has(b"Resources"));
        }
    }

    #[test]
    fn test_copy_same_page_twice_yields_distinct_pages() {
        let source = SourceDocument::load(&create_test_pdf(2, "Dup")).unwrap();
        let mut output = OutputDocument::new();
        let copies = output.copy_pages(&source, &[1, 1]).unwrap();
        assert_ne!(copies[0], copies[1]);
        for page in copies {
            output.append_page(page);
        }
        let bytes = output.serialize().unwrap();
        assert_eq!(page_labels(&bytes), vec!["Dup-Page-2", "Dup-Page-2"]);
    }

    #[test]
    fn test_copy_out_of_range_page_fails() {
        let source = SourceDocument::load(&create_test_pdf(2, "X")).unwrap();
        let mut output = OutputDocument::new();
        let err = output.copy_pages(&source, &[2]).unwrap_err();
        assert!(matches!(err, PdfToolsError::Validation(_)));
    }

    #[test]
    fn test_copy_does_not_pull_in_unselected_pages() {
        let source = SourceDocument::load(&create_test_pdf(5, "Big")).unwrap();
        let mut output = OutputDocument::new();
        for page in output.copy_pages(&source, &[0]).unwrap() {
            output.append_page(page);
        }
        let bytes = output.serialize().unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let page_objects = doc
            .objects
            .values()
            .filter(|o| matches!(o.as_dict().and_then(|d| d.get(b"Type")), Ok(Object::Name(n)) if n.as_slice() == b"Page"))
            .count();
        assert_eq!(page_objects, 1);
    }

    #[test]
    fn test_draw_image_on_created_page() {
        let mut output = OutputDocument::new();
        let page = output.create_page(PageSize::LETTER);
        let image = output
            .embed_image(&png_bytes(4, 2, png::ColorType::Rgba, &[0, 0, 0, 10]), ImageFormat::Png)
            .unwrap();
        let placement = fit(4.0, 2.0, 612.0, 792.0).unwrap();
        output.draw_image(page, &image, &placement).unwrap();
        output.append_page(page);
        let bytes = output.serialize().unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects.get(b"Im1").unwrap().as_reference().unwrap();
        let stream = doc.get_object(image_id).unwrap().as_stream().unwrap();
        assert!(stream.dict.has(b"SMask"));
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 4);

        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        let operators: Vec<&str> = content
            .operations
            .iter()
            .map(|op| op.operator.as_str())
            .collect();
        assert_eq!(operators, vec!["q", "cm", "Do", "Q"]);
    }

    #[test]
    fn test_embed_jpeg_keeps_dct_stream() {
        let mut output = OutputDocument::new();
        let image = output
            .embed_image(&jpeg_bytes(16, 8), ImageFormat::Jpeg)
            .unwrap();
        assert_eq!((image.width, image.height), (16, 8));
    }

    #[test]
    fn test_embed_cmyk_jpeg_tags_device_cmyk() {
        let bytes = cmyk_jpeg_bytes(8, 8);
        let inverted = crate::raster::decode(&bytes, ImageFormat::Jpeg)
            .unwrap()
            .decode
            .is_some();

        let mut output = OutputDocument::new();
        let image = output.embed_image(&bytes, ImageFormat::Jpeg).unwrap();
        let page = output.create_page(PageSize::LETTER);
        let placement = fit(8.0, 8.0, 612.0, 792.0).unwrap();
        output.draw_image(page, &image, &placement).unwrap();
        output.append_page(page);
        let pdf = output.serialize().unwrap();

        let doc = Document::load_mem(&pdf).unwrap();
        let stream = doc
            .objects
            .values()
            .filter_map(|o| o.as_stream().ok())
            .find(|s| matches!(s.dict.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Image"))
            .unwrap();
        assert_eq!(
            stream.dict.get(b"ColorSpace").unwrap().as_name().unwrap(),
            b"DeviceCMYK"
        );
        match stream.dict.get(b"Decode") {
            Ok(Object::Array(values)) => {
                assert!(inverted);
                assert_eq!(values.len(), 8);
            }
            _ => assert!(!inverted),
        }
    }

    #[test]
    fn test_embed_rejects_undecodable_bytes() {
        let mut output = OutputDocument::new();
        let err = output
            .embed_image(b"\x89PNG broken", ImageFormat::Png)
            .unwrap_err();
        assert!(matches!(err, PdfToolsError::UnsupportedFormat(_)));
    }
}
