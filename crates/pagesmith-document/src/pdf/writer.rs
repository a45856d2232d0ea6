// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — assembles brand-new documents from pages copied out of a
// `PageArena`, from cropped page windows, or from raster images.

use std::collections::{HashMap, HashSet};
use std::io::Write;

use flate2::Compression;
use flate2::write::ZlibEncoder;
use image::DynamicImage;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pagesmith_core::selection::{self, MinPageCount, PageGate};
use pagesmith_core::{BinaryDocument, CropWindow, DocumentType, PageSelection, PagesmithError, Result};
use tracing::{debug, info, instrument, warn};

use crate::image::processor::ImageProcessor;
use crate::pdf::reader::{INHERITABLE_KEYS, PageArena, resolve};
use crate::pdf::text::{StandardFont, TextRun};

const PDF_VERSION: &str = "1.5";

/// Builds a new PDF one page at a time.
///
/// Objects copied from a source arena are memoised, so resources shared by
/// several pages (fonts, images) are copied once. A builder copies from a
/// single source arena.
pub struct DocumentBuilder {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
    /// Source object id -> id of its copy in `document`.
    copied: HashMap<ObjectId, ObjectId>,
    /// Standard fonts already added, keyed to their object id.
    fonts: HashMap<StandardFont, ObjectId>,
    /// Page ids handed out by `reserve_pages` and not yet filled in.
    pending_pages: HashSet<ObjectId>,
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentBuilder {
    pub fn new() -> Self {
        let mut document = Document::with_version(PDF_VERSION);
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
            copied: HashMap::new(),
            fonts: HashMap::new(),
            pending_pages: HashSet::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.kids.len()
    }

    // -- Page sources ---------------------------------------------------------

    /// Announce the pages of `arena` that will be imported, so links between
    /// them (e.g. a `/Dest` on page 1 pointing at page 3) land on the copies.
    /// Links to pages that are never imported become `Null`.
    pub fn reserve_pages(&mut self, arena: &PageArena, indices: &[usize]) -> Result<()> {
        for &index in indices {
            let source_id = arena.page_id(index)?;
            if !self.copied.contains_key(&source_id) {
                let new_id = self.document.new_object_id();
                self.copied.insert(source_id, new_id);
                self.pending_pages.insert(new_id);
            }
        }
        Ok(())
    }

    /// Copy page `index` of `arena` (content, resources, annotations) and
    /// append it as the last page.
    pub fn import_page(&mut self, arena: &PageArena, index: usize) -> Result<()> {
        let source_id = arena.page_id(index)?;
        let page_dict = arena.page_dict(index)?.clone();

        // Register the id first so back-references (e.g. /Annots -> /P) land
        // on the copy rather than recursing into the page again.
        let reserved = self
            .copied
            .get(&source_id)
            .copied()
            .filter(|id| self.pending_pages.remove(id));
        let new_page_id = match reserved {
            Some(id) => id,
            None => {
                let id = self.document.new_object_id();
                self.copied.insert(source_id, id);
                id
            }
        };

        let mut new_dict = Dictionary::new();
        for (key, value) in page_dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.copy_object(arena.document(), value));
        }

        // Materialise attributes the page inherited from its old page tree.
        for key in INHERITABLE_KEYS {
            if new_dict.has(key) {
                continue;
            }
            if let Some(value) = arena.inherited(index, key)? {
                let value = value.clone();
                new_dict.set(key.to_vec(), self.copy_object(arena.document(), &value));
            }
        }
        if !new_dict.has(b"MediaBox") {
            let [x0, y0, x1, y1] = arena.media_box(index)?;
            new_dict.set("MediaBox", rect(x0, y0, x1, y1));
        }

        new_dict.set("Parent", Object::Reference(self.pages_id));
        self.document
            .objects
            .insert(new_page_id, Object::Dictionary(new_dict));
        self.kids.push(Object::Reference(new_page_id));
        Ok(())
    }

    /// Append a `width` x `height` page showing `window` of page `index` of
    /// `arena`, scaled to fill the new page exactly.
    ///
    /// The source page becomes a Form XObject clipped to the window, so the
    /// output stays vector.
    pub fn add_cropped_page(
        &mut self,
        arena: &PageArena,
        index: usize,
        window: &CropWindow,
        width: f64,
        height: f64,
    ) -> Result<()> {
        let [x0, y0, _, _] = arena.media_box(index)?;
        let left = x0 + window.left;
        let bottom = y0 + window.bottom;
        let right = x0 + window.right;
        let top = y0 + window.top;

        let mut form_dict = Dictionary::new();
        form_dict.set("Type", Object::Name(b"XObject".to_vec()));
        form_dict.set("Subtype", Object::Name(b"Form".to_vec()));
        form_dict.set("BBox", rect(left, bottom, right, top));
        if let Some(resources) = arena.resources(index)? {
            let resources = Object::Dictionary(resources.clone());
            form_dict.set("Resources", self.copy_object(arena.document(), &resources));
        }
        let mut form = Stream::new(form_dict, arena.content(index)?);
        compress_stream(&mut form);
        let form_id = self.document.add_object(form);

        let scale_x = width / window.width();
        let scale_y = height / window.height();
        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    real(scale_x),
                    real(0.0),
                    real(0.0),
                    real(scale_y),
                    real(-left * scale_x),
                    real(-bottom * scale_y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(b"Region".to_vec())]),
            Operation::new("Q", vec![]),
        ];

        let mut xobjects = Dictionary::new();
        xobjects.set("Region", Object::Reference(form_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        self.push_page(width, height, resources, operations)
    }

    /// Append a page sized to the image (one point per pixel) that shows
    /// `image` full-bleed, optionally with invisible text runs on top.
    pub fn add_image_page(
        &mut self,
        image: Stream,
        width: u32,
        height: u32,
        text_runs: &[TextRun],
    ) -> Result<()> {
        let image_id = self.document.add_object(image);
        let (w, h) = (f64::from(width), f64::from(height));

        let mut operations = vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![real(w), real(0.0), real(0.0), real(h), real(0.0), real(0.0)],
            ),
            Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
            Operation::new("Q", vec![]),
        ];

        let mut xobjects = Dictionary::new();
        xobjects.set("Im0", Object::Reference(image_id));
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        if !text_runs.is_empty() {
            let mut font_resources = Dictionary::new();
            for run in text_runs {
                let font = StandardFont::resolve(&run.font_name);
                let font_id = self.standard_font(font);
                font_resources.set(font.resource_name(), Object::Reference(font_id));
            }
            resources.set("Font", Object::Dictionary(font_resources));
            operations.extend(crate::pdf::text::overlay_operations(text_runs));
        }

        self.push_page(w, h, resources, operations)
    }

    // -- Output ---------------------------------------------------------------

    /// Write the page tree and catalog and serialise the document.
    pub fn finish(mut self) -> Result<BinaryDocument> {
        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(self.kids.len() as i64));
        pages_dict.set("Kids", Object::Array(self.kids));
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(catalog);
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        let mut output = Vec::new();
        self.document.save_to(&mut output).map_err(|err| {
            PagesmithError::PdfError(format!("failed to serialise PDF: {}", err))
        })?;
        Ok(BinaryDocument::new(output, DocumentType::Pdf))
    }

    // -- Helpers --------------------------------------------------------------

    fn push_page(
        &mut self,
        width: f64,
        height: f64,
        resources: Dictionary,
        operations: Vec<Operation>,
    ) -> Result<()> {
        let encoded = Content { operations }.encode().map_err(|err| {
            PagesmithError::PdfError(format!("failed to encode page content: {}", err))
        })?;
        let mut contents = Stream::new(Dictionary::new(), encoded);
        compress_stream(&mut contents);
        let contents_id = self.document.add_object(contents);

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("MediaBox", rect(0.0, 0.0, width, height));
        page.set("Resources", Object::Dictionary(resources));
        page.set("Contents", Object::Reference(contents_id));
        let page_id = self.document.add_object(page);
        self.kids.push(Object::Reference(page_id));
        Ok(())
    }

    fn standard_font(&mut self, font: StandardFont) -> ObjectId {
        if let Some(id) = self.fonts.get(&font) {
            return *id;
        }
        let id = self.document.add_object(font.font_dictionary());
        self.fonts.insert(font, id);
        id
    }

    /// Deep-copy `object` from `source`, following references. Each source
    /// object is copied once. References to page-tree nodes that are not
    /// being copied become `Null`, so a link never drags a foreign page in.
    fn copy_object(&mut self, source: &Document, object: &Object) -> Object {
        match object {
            Object::Reference(id) => {
                if let Some(copied) = self.copied.get(id) {
                    return Object::Reference(*copied);
                }
                let target = resolve(source, object);
                if is_page_tree_node(target) {
                    debug!(?id, "Dropping link to a page outside the output");
                    return Object::Null;
                }
                let target = target.clone();
                let new_id = self.document.new_object_id();
                self.copied.insert(*id, new_id);
                if matches!(target, Object::Null) {
                    warn!(?id, "Cannot resolve reference, using Null");
                }
                let copy = self.copy_object(source, &target);
                self.document.objects.insert(new_id, copy);
                Object::Reference(new_id)
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(source, dict)),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(source, item))
                    .collect(),
            ),
            Object::Stream(stream) => {
                let dict = self.copy_dict(source, &stream.dict);
                Object::Stream(Stream::new(dict, stream.content.clone()))
            }
            other => other.clone(),
        }
    }

    fn copy_dict(&mut self, source: &Document, dict: &Dictionary) -> Dictionary {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            new_dict.set(key.clone(), self.copy_object(source, value));
        }
        new_dict
    }
}

/// Pages, page-tree nodes and the catalog; the builder writes its own.
fn is_page_tree_node(object: &Object) -> bool {
    match object {
        Object::Dictionary(dict) => matches!(
            dict.get(b"Type"),
            Ok(Object::Name(kind)) if matches!(kind.as_slice(), b"Page" | b"Pages" | b"Catalog")
        ),
        _ => false,
    }
}

// -- Paged-document builder ---------------------------------------------------

/// Build a new PDF from `page_indices` of `source`, in the given order.
///
/// Indices may repeat or appear out of order; each occurrence becomes a page.
#[instrument(skip(source), fields(bytes_len = source.len()))]
pub fn build_from_pages(source: &BinaryDocument, page_indices: &[usize]) -> Result<BinaryDocument> {
    let arena = PageArena::from_document(source)?;
    build_from_arena(&arena, page_indices)
}

/// [`build_from_pages`] over an already-loaded arena.
pub fn build_from_arena(arena: &PageArena, page_indices: &[usize]) -> Result<BinaryDocument> {
    let page_count = arena.page_count();
    if let Some(&bad) = page_indices.iter().find(|&&index| index >= page_count) {
        return Err(PagesmithError::out_of_range(bad, page_count));
    }

    let mut builder = DocumentBuilder::new();
    builder.reserve_pages(arena, page_indices)?;
    for &index in page_indices {
        builder.import_page(arena, index)?;
    }
    let output = builder.finish()?;

    debug!(
        source_pages = page_count,
        output_pages = page_indices.len(),
        output_bytes = output.len(),
        "Pages copied into new document"
    );
    Ok(output)
}

/// Apply a keep/remove selection to a document.
///
/// Raster images and documents gated out by `min_page_count` are returned
/// unchanged.
pub fn apply_page_selection(
    source: &BinaryDocument,
    selection: &PageSelection,
) -> Result<BinaryDocument> {
    apply_page_selection_with_gate(source, selection, &MinPageCount(selection.min_page_count))
}

/// [`apply_page_selection`] with a caller-supplied gate in place of the
/// selection's `min_page_count`.
#[instrument(skip(source, gate), fields(bytes_len = source.len()))]
pub fn apply_page_selection_with_gate(
    source: &BinaryDocument,
    selection: &PageSelection,
    gate: &dyn PageGate,
) -> Result<BinaryDocument> {
    if !source.is_pdf() {
        debug!(mime = source.mime_type(), "Page selection ignored for raster image");
        return Ok(source.clone());
    }

    let arena = PageArena::from_bytes(source.bytes())?;
    let page_count = arena.page_count();
    let Some(retained) = selection::resolve_gated(page_count, selection, gate)? else {
        return Ok(source.clone());
    };
    info!(page_count, retained = retained.len(), "Applying page selection");
    build_from_arena(&arena, &retained)
}

// -- Raster images ------------------------------------------------------------

/// Wrap a raster image into a single-page PDF whose page measures the image's
/// pixel dimensions.
#[instrument(skip_all, fields(bytes_len = source.len()))]
pub fn raster_to_pdf(source: &BinaryDocument) -> Result<BinaryDocument> {
    if source.is_pdf() {
        return Ok(source.clone());
    }
    let processor = ImageProcessor::from_bytes(source.bytes())?;
    let image = processor.as_dynamic();
    let (width, height) = (image.width(), image.height());

    // JPEG data can be embedded as-is; everything else is stored as pixels.
    let stream = if source.document_type() == DocumentType::Jpeg {
        jpeg_image_stream(
            source.bytes().to_vec(),
            width,
            height,
            !image.color().has_color(),
        )
    } else {
        raw_image_stream(image)?
    };

    let mut builder = DocumentBuilder::new();
    builder.add_image_page(stream, width, height, &[])?;
    debug!(width, height, "Raster wrapped into single-page PDF");
    builder.finish()
}

// -- Image streams ------------------------------------------------------------

/// An image XObject carrying already-encoded JPEG bytes.
pub fn jpeg_image_stream(jpeg: Vec<u8>, width: u32, height: u32, grayscale: bool) -> Stream {
    let mut dict = image_dict(width, height, grayscale);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    Stream::new(dict, jpeg).with_compression(false)
}

/// A Flate-compressed image XObject of the decoded pixels. Alpha is dropped.
pub fn raw_image_stream(image: &DynamicImage) -> Result<Stream> {
    let grayscale = !image.color().has_color();
    let (width, height) = (image.width(), image.height());
    let pixels = if grayscale {
        image.to_luma8().into_raw()
    } else {
        image.to_rgb8().into_raw()
    };

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&pixels)?;
    let compressed = encoder.finish()?;

    let mut dict = image_dict(width, height, grayscale);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    Ok(Stream::new(dict, compressed).with_compression(false))
}

fn image_dict(width: u32, height: u32, grayscale: bool) -> Dictionary {
    let color_space: &[u8] = if grayscale { b"DeviceGray" } else { b"DeviceRGB" };
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(i64::from(width)));
    dict.set("Height", Object::Integer(i64::from(height)));
    dict.set("ColorSpace", Object::Name(color_space.to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

fn compress_stream(stream: &mut Stream) {
    if let Err(err) = stream.compress() {
        debug!(%err, "Stream left uncompressed");
    }
}

pub(crate) fn real(value: f64) -> Object {
    Object::Real(value as _)
}

fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Object {
    Object::Array(vec![real(x0), real(y0), real(x1), real(y1)])
}
