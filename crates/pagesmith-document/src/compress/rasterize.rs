// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterization — turns each page of a PDF into a bitmap at one pixel
// per point. The built-in backend composites the page's image XObjects; the
// optional `pdfium` backend renders arbitrary vector content.

use std::io::Read;

use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, ImageFormat, Rgb, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, Stream};
use pagesmith_core::{PagesmithError, Result};
use tracing::{debug, instrument};

use crate::image::processor::ImageProcessor;
use crate::pdf::reader::{IDENTITY, Matrix, PageArena, matrix_operands, multiply, number, resolve};

/// Nesting limit for Form XObjects drawing other Form XObjects.
const MAX_FORM_DEPTH: usize = 8;

/// Renders every page of a PDF to an image.
pub trait PageRasterizer {
    /// One image per page, in page order, at one pixel per point.
    ///
    /// A failure on a page is reported as [`PagesmithError::Compression`]
    /// naming that page.
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>>;
}

/// Pure-Rust rasterizer for pages whose visible content is raster images —
/// scans, photos, and every page this engine produces itself.
///
/// Images are composited onto a white page at the position given by the
/// current transformation matrix. A page that shows visible text, paints
/// vector content, or draws no image at all is an error rather than a
/// partial render. Invisible text (render modes 3 and 7) is allowed.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedImageRasterizer;

impl PageRasterizer for EmbeddedImageRasterizer {
    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>> {
        let arena = PageArena::from_bytes(pdf)?;
        (0..arena.page_count())
            .map(|index| {
                rasterize_page(&arena, index).map_err(|err| PagesmithError::Compression {
                    page: index,
                    reason: err.to_string(),
                })
            })
            .collect()
    }
}

fn rasterize_page(arena: &PageArena, index: usize) -> Result<DynamicImage> {
    let [x0, y0, x1, y1] = arena.media_box(index)?;
    let width = ((x1 - x0).round() as u32).max(1);
    let height = ((y1 - y0).round() as u32).max(1);

    let mut painter = Painter {
        document: arena.document(),
        canvas: RgbImage::from_pixel(width, height, Rgb([255, 255, 255])),
        origin: (x0, y0),
        painted: 0,
    };
    let content = arena.content(index)?;
    let empty = Dictionary::new();
    let resources = arena.resources(index)?.unwrap_or(&empty);
    painter.paint(&content, resources, GraphicsState::default(), 0)?;

    if painter.painted == 0 {
        return Err(PagesmithError::PdfError(
            "page has no raster content; enable the pdfium backend for vector pages".into(),
        ));
    }
    debug!(page = index, images = painter.painted, width, height, "Page rasterized");
    Ok(DynamicImage::ImageRgb8(painter.canvas))
}

/// Operators that paint paths, shadings or inline images.
const VECTOR_PAINT_OPERATORS: &[&str] = &[
    "f", "F", "f*", "S", "s", "B", "B*", "b", "b*", "sh", "BI", "EI",
];

/// Text render modes that leave no mark on the page.
const INVISIBLE_TEXT_MODES: [i64; 2] = [3, 7];

/// The part of the graphics state the painter tracks; saved by `q`.
#[derive(Debug, Clone, Copy)]
struct GraphicsState {
    ctm: Matrix,
    text_render_mode: i64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: IDENTITY,
            text_render_mode: 0,
        }
    }
}

struct Painter<'a> {
    document: &'a Document,
    canvas: RgbImage,
    origin: (f64, f64),
    painted: usize,
}

impl Painter<'_> {
    /// Composite the images drawn by `content`. Visible text and vector
    /// painting cannot be rendered here and fail the page.
    fn paint(
        &mut self,
        content: &[u8],
        resources: &Dictionary,
        base: GraphicsState,
        depth: usize,
    ) -> Result<()> {
        if content.is_empty() {
            return Ok(());
        }
        let content = Content::decode(content).map_err(|err| {
            PagesmithError::PdfError(format!("cannot parse content stream: {}", err))
        })?;

        let mut state = base;
        let mut stack = Vec::new();
        for operation in &content.operations {
            let operator = operation.operator.as_str();
            match operator {
                "q" => stack.push(state),
                "Q" => state = stack.pop().unwrap_or(base),
                "cm" => {
                    if let Some(matrix) = matrix_operands(&operation.operands) {
                        state.ctm = multiply(matrix, state.ctm);
                    }
                }
                "Tr" => {
                    if let Some(Object::Integer(mode)) = operation.operands.first() {
                        state.text_render_mode = *mode;
                    }
                }
                "Tj" | "TJ" | "'" | "\"" => {
                    if !INVISIBLE_TEXT_MODES.contains(&state.text_render_mode) {
                        return Err(PagesmithError::PdfError(format!(
                            "page shows visible text (`{}`); enable the pdfium backend",
                            operator
                        )));
                    }
                }
                "Do" => {
                    if let Some(Object::Name(name)) = operation.operands.first() {
                        self.draw_xobject(name, resources, state, depth)?;
                    }
                }
                _ if VECTOR_PAINT_OPERATORS.contains(&operator) => {
                    return Err(PagesmithError::PdfError(format!(
                        "page paints vector content (`{}`); enable the pdfium backend",
                        operator
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn draw_xobject(
        &mut self,
        name: &[u8],
        resources: &Dictionary,
        state: GraphicsState,
        depth: usize,
    ) -> Result<()> {
        let Some(stream) = self.lookup_xobject(resources, name) else {
            return Ok(());
        };
        match stream.dict.get(b"Subtype") {
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Image" => {
                let image = decode_image_xobject(&stream)?;
                self.composite(&image, state.ctm);
                Ok(())
            }
            Ok(Object::Name(subtype)) if subtype.as_slice() == b"Form" && depth < MAX_FORM_DEPTH => {
                let matrix = stream
                    .dict
                    .get(b"Matrix")
                    .ok()
                    .and_then(|object| match resolve(self.document, object) {
                        Object::Array(values) => matrix_operands(values),
                        _ => None,
                    })
                    .unwrap_or(IDENTITY);
                let form_resources = match stream.dict.get(b"Resources") {
                    Ok(object) => match resolve(self.document, object) {
                        Object::Dictionary(dict) => dict.clone(),
                        _ => resources.clone(),
                    },
                    Err(_) => resources.clone(),
                };
                let content = stream_bytes(&stream)?;
                let form_state = GraphicsState {
                    ctm: multiply(matrix, state.ctm),
                    ..state
                };
                self.paint(&content, &form_resources, form_state, depth + 1)
            }
            _ => Ok(()),
        }
    }

    fn lookup_xobject(&self, resources: &Dictionary, name: &[u8]) -> Option<Stream> {
        let xobjects = match resolve(self.document, resources.get(b"XObject").ok()?) {
            Object::Dictionary(dict) => dict,
            _ => return None,
        };
        match resolve(self.document, xobjects.get(name).ok()?) {
            Object::Stream(stream) => Some(stream.clone()),
            _ => None,
        }
    }

    /// Paint `image` where the unit square lands under `ctm`. Skewed or
    /// rotated placements are skipped.
    fn composite(&mut self, image: &DynamicImage, ctm: Matrix) {
        let [a, b, c, d, e, f] = ctm;
        if b.abs() > 1e-6 || c.abs() > 1e-6 || a.abs() < 0.5 || d.abs() < 0.5 {
            debug!(?ctm, "Skipping non-axis-aligned image placement");
            return;
        }

        let draw_w = a.abs().round() as u32;
        let draw_h = d.abs().round() as u32;
        let mut placed = ImageProcessor::from_dynamic(image.clone())
            .resize_exact(draw_w.max(1), draw_h.max(1))
            .into_dynamic();
        if a < 0.0 {
            placed = placed.fliph();
        }
        if d < 0.0 {
            placed = placed.flipv();
        }

        let left = e.min(e + a) - self.origin.0;
        let top_in_page = f.max(f + d) - self.origin.1;
        let top = f64::from(self.canvas.height()) - top_in_page;
        image::imageops::overlay(
            &mut self.canvas,
            &placed.to_rgb8(),
            left.round() as i64,
            top.round() as i64,
        );
        self.painted += 1;
    }
}

/// Decode an image XObject into pixels. Supports DCT (JPEG) data and 8-bit
/// DeviceRGB / DeviceGray samples, raw or Flate-compressed.
fn decode_image_xobject(stream: &Stream) -> Result<DynamicImage> {
    if first_filter(stream).as_deref() == Some(b"DCTDecode".as_slice()) {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| PagesmithError::ImageError(format!("bad JPEG XObject: {}", err)));
    }

    let width = dict_u32(&stream.dict, b"Width")?;
    let height = dict_u32(&stream.dict, b"Height")?;
    let bits = dict_u32(&stream.dict, b"BitsPerComponent").unwrap_or(8);
    if bits != 8 {
        return Err(PagesmithError::ImageError(format!(
            "unsupported BitsPerComponent {}",
            bits
        )));
    }
    let samples = stream_bytes(stream)?;
    let pixels = width as usize * height as usize;

    let color_space = match stream.dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => name.clone(),
        _ => b"DeviceRGB".to_vec(),
    };
    let decoded = match color_space.as_slice() {
        b"DeviceGray" if samples.len() >= pixels => {
            GrayImage::from_raw(width, height, samples[..pixels].to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" if samples.len() >= pixels * 3 => {
            RgbImage::from_raw(width, height, samples[..pixels * 3].to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        _ => None,
    };
    decoded.ok_or_else(|| {
        PagesmithError::ImageError(format!(
            "unsupported image XObject ({}, {}x{}, {} bytes)",
            String::from_utf8_lossy(&color_space),
            width,
            height,
            samples.len()
        ))
    })
}

fn first_filter(stream: &Stream) -> Option<Vec<u8>> {
    match stream.dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.clone()),
        Object::Array(filters) => match filters.first()? {
            Object::Name(name) => Some(name.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Stream data with any Flate filter removed. DCT data is handled by the
/// caller; other filters fall back to lopdf.
fn stream_bytes(stream: &Stream) -> Result<Vec<u8>> {
    match first_filter(stream).as_deref() {
        None => Ok(stream.content.clone()),
        Some(b"FlateDecode") => {
            let mut decoded = Vec::new();
            ZlibDecoder::new(stream.content.as_slice())
                .read_to_end(&mut decoded)
                .map_err(|err| {
                    PagesmithError::PdfError(format!("corrupt Flate stream: {}", err))
                })?;
            Ok(decoded)
        }
        Some(_) => stream
            .decompressed_content()
            .map_err(|err| PagesmithError::PdfError(format!("cannot decode stream: {}", err))),
    }
}

fn dict_u32(dict: &Dictionary, key: &[u8]) -> Result<u32> {
    dict.get(key)
        .ok()
        .and_then(number)
        .filter(|value| *value >= 0.0)
        .map(|value| value as u32)
        .ok_or_else(|| {
            PagesmithError::ImageError(format!(
                "image XObject lacks /{}",
                String::from_utf8_lossy(key)
            ))
        })
}

// -- PDFium backend -----------------------------------------------------------

#[cfg(feature = "pdfium")]
pub use pdfium_backend::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use image::DynamicImage;
    use pagesmith_core::{PagesmithError, Result};
    use pdfium_render::prelude::{PdfRenderConfig, Pdfium};
    use tracing::{info, instrument};

    use super::PageRasterizer;

    /// Renders pages with PDFium, loaded from the working directory or the
    /// system library path.
    pub struct PdfiumRasterizer {
        pdfium: Pdfium,
    }

    impl PdfiumRasterizer {
        pub fn new() -> Result<Self> {
            let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|err| PagesmithError::Rasterizer(format!("cannot load PDFium: {}", err)))?;
            info!("PDFium bound");
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl PageRasterizer for PdfiumRasterizer {
        #[instrument(skip_all, fields(bytes_len = pdf.len()))]
        fn rasterize(&self, pdf: &[u8]) -> Result<Vec<DynamicImage>> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|err| PagesmithError::PdfError(format!("PDFium cannot open PDF: {}", err)))?;
            let config = PdfRenderConfig::new().scale_page_by_factor(1.0);

            document
                .pages()
                .iter()
                .enumerate()
                .map(|(index, page)| {
                    page.render_with_config(&config)
                        .map(|bitmap| bitmap.as_image())
                        .map_err(|err| PagesmithError::Compression {
                            page: index,
                            reason: err.to_string(),
                        })
                })
                .collect()
        }
    }
}
