// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory fixtures shared by the unit tests: small PDFs built directly with
// lopdf, and deterministic synthetic images.

use image::{DynamicImage, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use pagesmith_core::BinaryDocument;

use crate::image::processor::ImageProcessor;
use crate::pdf::writer::{raster_to_pdf, real};

const FIXTURE_PAGE_HEIGHT: f64 = 200.0;

/// Assembles a PDF page by page.
struct Fixture {
    document: Document,
    pages_id: ObjectId,
    kids: Vec<Object>,
}

impl Fixture {
    fn new() -> Self {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        Self {
            document,
            pages_id,
            kids: Vec::new(),
        }
    }

    fn add_page(
        &mut self,
        media_box: Option<[f64; 4]>,
        resources: Dictionary,
        operations: Vec<Operation>,
    ) -> ObjectId {
        let content = Content { operations }.encode().unwrap();
        let contents_id = self.document.add_object(Stream::new(Dictionary::new(), content));

        let mut page = Dictionary::new();
        page.set("Type", Object::Name(b"Page".to_vec()));
        page.set("Parent", Object::Reference(self.pages_id));
        page.set("Contents", Object::Reference(contents_id));
        page.set("Resources", Object::Dictionary(resources));
        if let Some(rect) = media_box {
            page.set("MediaBox", rect_object(rect));
        }
        let page_id = self.document.add_object(page);
        self.kids.push(Object::Reference(page_id));
        page_id
    }

    /// Uncompressed 8-bit RGB image XObject.
    fn add_image(&mut self, image: &DynamicImage) -> ObjectId {
        let rgb = image.to_rgb8();
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(i64::from(rgb.width())));
        dict.set("Height", Object::Integer(i64::from(rgb.height())));
        dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        self.document
            .add_object(Stream::new(dict, rgb.into_raw()).with_compression(false))
    }

    fn add_font(&mut self) -> ObjectId {
        let mut font = Dictionary::new();
        font.set("Type", Object::Name(b"Font".to_vec()));
        font.set("Subtype", Object::Name(b"Type1".to_vec()));
        font.set("BaseFont", Object::Name(b"Times-Bold".to_vec()));
        self.document.add_object(font)
    }

    fn finish(mut self, tree_media_box: Option<[f64; 4]>) -> Vec<u8> {
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(self.kids.len() as i64));
        pages.set("Kids", Object::Array(self.kids));
        if let Some(rect) = tree_media_box {
            pages.set("MediaBox", rect_object(rect));
        }
        self.document
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(self.pages_id));
        let catalog_id = self.document.add_object(catalog);
        self.document.trailer.set("Root", Object::Reference(catalog_id));

        let mut bytes = Vec::new();
        self.document.save_to(&mut bytes).unwrap();
        bytes
    }
}

fn rect_object([x0, y0, x1, y1]: [f64; 4]) -> Object {
    Object::Array(vec![real(x0), real(y0), real(x1), real(y1)])
}

fn op(operator: &str, operands: Vec<Object>) -> Operation {
    Operation::new(operator, operands)
}

fn filled_square() -> Vec<Operation> {
    vec![
        op("g", vec![real(0.5)]),
        op("re", vec![real(0.0), real(0.0), real(10.0), real(10.0)]),
        op("f", vec![]),
    ]
}

fn draw_image(name: &str, ctm: [f64; 6]) -> Vec<Operation> {
    vec![
        op("q", vec![]),
        op("cm", ctm.iter().map(|value| real(*value)).collect()),
        op("Do", vec![Object::Name(name.as_bytes().to_vec())]),
        op("Q", vec![]),
    ]
}

fn show_text(text: &str, x: f64, y: f64) -> Vec<Operation> {
    vec![
        op("BT", vec![]),
        op("Tf", vec![Object::Name(b"F1".to_vec()), Object::Integer(12)]),
        op("Td", vec![real(x), real(y)]),
        op(
            "Tj",
            vec![Object::String(text.as_bytes().to_vec(), StringFormat::Literal)],
        ),
        op("ET", vec![]),
    ]
}

fn xobject_resources(name: &str, id: ObjectId) -> Dictionary {
    let mut xobjects = Dictionary::new();
    xobjects.set(name, Object::Reference(id));
    let mut resources = Dictionary::new();
    resources.set("XObject", Object::Dictionary(xobjects));
    resources
}

fn add_font_resource(resources: &mut Dictionary, font_id: ObjectId) {
    let mut fonts = Dictionary::new();
    fonts.set("F1", Object::Reference(font_id));
    resources.set("Font", Object::Dictionary(fonts));
}

// -- PDFs ---------------------------------------------------------------------

/// One page per width, each `width` x 200 with a small filled square.
pub fn sized_pages_pdf(widths: &[f64]) -> Vec<u8> {
    let mut fixture = Fixture::new();
    for &width in widths {
        fixture.add_page(
            Some([0.0, 0.0, width, FIXTURE_PAGE_HEIGHT]),
            Dictionary::new(),
            filled_square(),
        );
    }
    fixture.finish(None)
}

pub fn sized_pages_document(widths: &[f64]) -> BinaryDocument {
    BinaryDocument::sniffed(sized_pages_pdf(widths)).unwrap()
}

/// A single vector page of the given size.
pub fn page_pdf(width: f64, height: f64) -> Vec<u8> {
    let mut fixture = Fixture::new();
    fixture.add_page(Some([0.0, 0.0, width, height]), Dictionary::new(), filled_square());
    fixture.finish(None)
}

/// One page whose MediaBox lives only on the page tree root.
pub fn inherited_media_box_pdf(width: f64, height: f64) -> Vec<u8> {
    let mut fixture = Fixture::new();
    fixture.add_page(None, Dictionary::new(), filled_square());
    fixture.finish(Some([0.0, 0.0, width, height]))
}

/// `pages` pages with empty content streams.
pub fn blank_pdf(pages: usize) -> Vec<u8> {
    let mut fixture = Fixture::new();
    for _ in 0..pages {
        fixture.add_page(Some([0.0, 0.0, 612.0, 792.0]), Dictionary::new(), Vec::new());
    }
    fixture.finish(None)
}

/// Pages 100, 110 and 120 wide. Page 0 carries a link to each other page
/// and a form widget whose field dictionary hangs off its `/Parent`.
pub fn annotated_pages_pdf() -> Vec<u8> {
    let mut fixture = Fixture::new();
    let pages: Vec<ObjectId> = [100.0, 110.0, 120.0]
        .iter()
        .map(|&width| {
            fixture.add_page(
                Some([0.0, 0.0, width, FIXTURE_PAGE_HEIGHT]),
                Dictionary::new(),
                filled_square(),
            )
        })
        .collect();

    let mut annots = Vec::new();
    for &target in &pages[1..] {
        let mut link = Dictionary::new();
        link.set("Type", Object::Name(b"Annot".to_vec()));
        link.set("Subtype", Object::Name(b"Link".to_vec()));
        link.set("Rect", rect_object([0.0, 0.0, 10.0, 10.0]));
        link.set(
            "Dest",
            Object::Array(vec![Object::Reference(target), Object::Name(b"Fit".to_vec())]),
        );
        annots.push(Object::Reference(fixture.document.add_object(link)));
    }

    let mut field = Dictionary::new();
    field.set("FT", Object::Name(b"Tx".to_vec()));
    field.set("T", Object::string_literal("total"));
    let field_id = fixture.document.add_object(field);

    let mut widget = Dictionary::new();
    widget.set("Type", Object::Name(b"Annot".to_vec()));
    widget.set("Subtype", Object::Name(b"Widget".to_vec()));
    widget.set("Rect", rect_object([20.0, 20.0, 60.0, 30.0]));
    widget.set("Parent", Object::Reference(field_id));
    widget.set("P", Object::Reference(pages[0]));
    let widget_id = fixture.document.add_object(widget);
    annots.push(Object::Reference(widget_id));

    if let Ok(Object::Dictionary(field)) = fixture.document.get_object_mut(field_id) {
        field.set("Kids", Object::Array(vec![Object::Reference(widget_id)]));
    }
    if let Ok(Object::Dictionary(page)) = fixture.document.get_object_mut(pages[0]) {
        page.set("Annots", Object::Array(annots));
    }
    fixture.finish(None)
}

/// A Letter page showing each `(text, x, y)` in Times-Bold 12 (resource F1).
pub fn text_pdf(runs: &[(&str, f64, f64)]) -> Vec<u8> {
    let operations = runs
        .iter()
        .flat_map(|(text, x, y)| show_text(text, *x, *y))
        .collect();
    pdf_with_operations(operations)
}

/// A Letter page with arbitrary content; font F1 is Times-Bold.
pub fn pdf_with_operations(operations: Vec<Operation>) -> Vec<u8> {
    let mut fixture = Fixture::new();
    let font_id = fixture.add_font();
    let mut resources = Dictionary::new();
    add_font_resource(&mut resources, font_id);
    fixture.add_page(Some([0.0, 0.0, 612.0, 792.0]), resources, operations);
    fixture.finish(None)
}

/// A scanned page: `image` drawn full-bleed on a page of its pixel size,
/// stored as raw uncompressed RGB.
pub fn image_pdf(image: &DynamicImage) -> Vec<u8> {
    let (width, height) = (f64::from(image.width()), f64::from(image.height()));
    placed_image_pdf(image, width, height, [width, 0.0, 0.0, height, 0.0, 0.0])
}

/// `image` drawn under `ctm` on a `width` x `height` page.
pub fn placed_image_pdf(image: &DynamicImage, width: f64, height: f64, ctm: [f64; 6]) -> Vec<u8> {
    let mut fixture = Fixture::new();
    let image_id = fixture.add_image(image);
    fixture.add_page(
        Some([0.0, 0.0, width, height]),
        xobject_resources("Im1", image_id),
        draw_image("Im1", ctm),
    );
    fixture.finish(None)
}

/// A scanned page with visible text drawn on top of the image.
pub fn image_with_text_pdf(image: &DynamicImage, runs: &[(&str, f64, f64)]) -> Vec<u8> {
    scan_with_text(image, runs, false)
}

/// A scanned page carrying an invisible (render mode 3) OCR text layer.
pub fn ocr_scan_pdf(image: &DynamicImage, runs: &[(&str, f64, f64)]) -> Vec<u8> {
    scan_with_text(image, runs, true)
}

fn scan_with_text(image: &DynamicImage, runs: &[(&str, f64, f64)], invisible: bool) -> Vec<u8> {
    let (width, height) = (f64::from(image.width()), f64::from(image.height()));
    let mut fixture = Fixture::new();
    let image_id = fixture.add_image(image);
    let font_id = fixture.add_font();

    let mut resources = xobject_resources("Im1", image_id);
    add_font_resource(&mut resources, font_id);
    let mut operations = draw_image("Im1", [width, 0.0, 0.0, height, 0.0, 0.0]);
    if invisible {
        operations.push(op("Tr", vec![Object::Integer(3)]));
    }
    for (text, x, y) in runs {
        operations.extend(show_text(text, *x, *y));
    }
    fixture.add_page(Some([0.0, 0.0, width, height]), resources, operations);
    fixture.finish(None)
}

/// A scanned page with a vector-filled square painted over the image.
pub fn image_with_fill_pdf(image: &DynamicImage) -> Vec<u8> {
    let (width, height) = (f64::from(image.width()), f64::from(image.height()));
    let mut fixture = Fixture::new();
    let image_id = fixture.add_image(image);
    let mut operations = draw_image("Im1", [width, 0.0, 0.0, height, 0.0, 0.0]);
    operations.extend(filled_square());
    fixture.add_page(
        Some([0.0, 0.0, width, height]),
        xobject_resources("Im1", image_id),
        operations,
    );
    fixture.finish(None)
}

/// Image pages for `Some`, vector-only 100 x 100 pages for `None`.
pub fn mixed_pdf(pages: &[Option<DynamicImage>]) -> Vec<u8> {
    let mut fixture = Fixture::new();
    for page in pages {
        match page {
            Some(image) => {
                let (width, height) = (f64::from(image.width()), f64::from(image.height()));
                let image_id = fixture.add_image(image);
                fixture.add_page(
                    Some([0.0, 0.0, width, height]),
                    xobject_resources("Im1", image_id),
                    draw_image("Im1", [width, 0.0, 0.0, height, 0.0, 0.0]),
                );
            }
            None => {
                fixture.add_page(
                    Some([0.0, 0.0, 100.0, 100.0]),
                    Dictionary::new(),
                    filled_square(),
                );
            }
        }
    }
    fixture.finish(None)
}

/// A JPEG wrapped into a one-page PDF (DCTDecode image XObject).
pub fn jpeg_pdf(width: u32, height: u32) -> Vec<u8> {
    let jpeg = BinaryDocument::sniffed(jpeg_bytes(width, height)).unwrap();
    raster_to_pdf(&jpeg).unwrap().into_bytes()
}

// -- Images -------------------------------------------------------------------

/// A colour gradient with deterministic per-pixel noise.
pub fn noisy_image(width: u32, height: u32) -> DynamicImage {
    let mut state: u32 = 0x2545_F491;
    let image = RgbImage::from_fn(width, height, |x, y| {
        state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        let noise = (state >> 24) as i32 % 25 - 12;
        let red = (x * 255 / width.max(1)) as i32;
        let green = (y * 255 / height.max(1)) as i32;
        let channel = |base: i32| (base + noise).clamp(0, 255) as u8;
        Rgb([channel(red), channel(green), channel(128)])
    });
    DynamicImage::ImageRgb8(image)
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    ImageProcessor::from_dynamic(noisy_image(width, height))
        .to_png_bytes()
        .unwrap()
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    ImageProcessor::from_dynamic(noisy_image(width, height))
        .to_jpeg_bytes(85)
        .unwrap()
}
