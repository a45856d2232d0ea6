// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Region extractor — crops a normalized bounding box out of one page into a
// standalone single-page document (or a cropped raster image).

use std::path::{Path, PathBuf};

use image::DynamicImage;
use pagesmith_core::{
    BinaryDocument, BoundingBox, CompressionRequest, NormalizedPolygon, PagesmithError,
    RegionImageFormat, Result,
};
use tracing::{debug, info, instrument};

use crate::compress::rasterize::PageRasterizer;
use crate::extract::save_output;
use crate::image::processor::ImageProcessor;
use crate::pdf::reader::PageArena;
use crate::pdf::writer::{DocumentBuilder, build_from_arena, raster_to_pdf};

/// A region cut out of a source page, as a single-page PDF.
#[derive(Debug, Clone)]
pub struct ExtractedRegion {
    document: BinaryDocument,
    page_id: usize,
    region_id: usize,
}

impl ExtractedRegion {
    pub fn document(&self) -> &BinaryDocument {
        &self.document
    }

    pub fn into_document(self) -> BinaryDocument {
        self.document
    }

    pub fn bytes(&self) -> &[u8] {
        self.document.bytes()
    }

    /// Index of the source page the region was cut from.
    pub fn page_id(&self) -> usize {
        self.page_id
    }

    /// Position of the region among those extracted from its page.
    pub fn region_id(&self) -> usize {
        self.region_id
    }

    /// Suggested file name, `{subject}_p{page}_{region}.pdf`.
    pub fn filename(&self, subject: &str) -> String {
        format!("{}_p{}_{}.pdf", subject, self.page_id, self.region_id)
    }

    pub fn save_to_dir(&self, dir: impl AsRef<Path>, subject: &str) -> Result<PathBuf> {
        save_output(dir.as_ref(), self.filename(subject), self.bytes())
    }
}

/// A region cut out of a source page, as an encoded raster image.
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    document: BinaryDocument,
    format: RegionImageFormat,
    page_id: usize,
    region_id: usize,
}

impl ExtractedImage {
    pub fn document(&self) -> &BinaryDocument {
        &self.document
    }

    pub fn bytes(&self) -> &[u8] {
        self.document.bytes()
    }

    pub fn page_id(&self) -> usize {
        self.page_id
    }

    pub fn region_id(&self) -> usize {
        self.region_id
    }

    /// Suggested file name, `{subject}_p{page}_{region}.{jpg|png}`.
    pub fn filename(&self, subject: &str) -> String {
        format!(
            "{}_p{}_{}.{}",
            subject,
            self.page_id,
            self.region_id,
            self.format.extension()
        )
    }

    pub fn save_to_dir(&self, dir: impl AsRef<Path>, subject: &str) -> Result<PathBuf> {
        save_output(dir.as_ref(), self.filename(subject), self.bytes())
    }
}

// -- PDF regions ----------------------------------------------------------------

/// Crop `bbox` out of page `page_index` into a new single-page PDF.
///
/// The page measures the box's share of the source page and the cropped
/// content is scaled to fill it. A raster source is treated as a one-page
/// document whose page is its pixel size.
#[instrument(skip(source), fields(bytes_len = source.len()))]
pub fn extract_region(
    source: &BinaryDocument,
    page_index: usize,
    bbox: &BoundingBox,
) -> Result<BinaryDocument> {
    let arena = paged_arena(source)?;
    crop_page(&arena, page_index, bbox)
}

/// Extract one region per polygon from page `page_index`. Region ids follow
/// the polygon order.
#[instrument(skip(source, polygons), fields(bytes_len = source.len(), regions = polygons.len()))]
pub fn extract_regions(
    source: &BinaryDocument,
    page_index: usize,
    polygons: &[NormalizedPolygon],
) -> Result<Vec<ExtractedRegion>> {
    let arena = paged_arena(source)?;
    let regions = polygons
        .iter()
        .enumerate()
        .map(|(region_id, polygon)| {
            let bbox = polygon.bounding_box()?;
            Ok(ExtractedRegion {
                document: crop_page(&arena, page_index, &bbox)?,
                page_id: page_index,
                region_id,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(page = page_index, regions = regions.len(), "Regions extracted");
    Ok(regions)
}

fn paged_arena(source: &BinaryDocument) -> Result<PageArena> {
    if source.is_pdf() {
        PageArena::from_bytes(source.bytes())
    } else {
        PageArena::from_bytes(raster_to_pdf(source)?.bytes())
    }
}

fn crop_page(arena: &PageArena, page_index: usize, bbox: &BoundingBox) -> Result<BinaryDocument> {
    let (width, height) = arena.page_size(page_index)?;
    let window = bbox.crop_window(width, height)?;

    let mut builder = DocumentBuilder::new();
    builder.add_cropped_page(arena, page_index, &window, window.width(), window.height())?;
    debug!(
        page = page_index,
        new_width = window.width(),
        new_height = window.height(),
        "Region cropped"
    );
    builder.finish()
}

// -- Image regions --------------------------------------------------------------

/// Crop `bbox` out of page `page_index` and encode it as an image.
///
/// PDF pages are rendered with `rasterizer` first; raster sources are cropped
/// directly. `quality` only applies to JPEG output.
#[instrument(skip(source, rasterizer), fields(bytes_len = source.len()))]
pub fn extract_region_image(
    source: &BinaryDocument,
    page_index: usize,
    bbox: &BoundingBox,
    format: RegionImageFormat,
    quality: u8,
    rasterizer: &dyn PageRasterizer,
) -> Result<BinaryDocument> {
    let quality = CompressionRequest::new(quality).validated_quality()?;
    let page = page_image(source, page_index, rasterizer)?;
    crop_image(&page, bbox, format, quality)
}

/// Image counterpart of [`extract_regions`]; the page is rendered once.
pub fn extract_region_images(
    source: &BinaryDocument,
    page_index: usize,
    polygons: &[NormalizedPolygon],
    format: RegionImageFormat,
    quality: u8,
    rasterizer: &dyn PageRasterizer,
) -> Result<Vec<ExtractedImage>> {
    let quality = CompressionRequest::new(quality).validated_quality()?;
    let page = page_image(source, page_index, rasterizer)?;
    polygons
        .iter()
        .enumerate()
        .map(|(region_id, polygon)| {
            Ok(ExtractedImage {
                document: crop_image(&page, &polygon.bounding_box()?, format, quality)?,
                format,
                page_id: page_index,
                region_id,
            })
        })
        .collect()
}

fn page_image(
    source: &BinaryDocument,
    page_index: usize,
    rasterizer: &dyn PageRasterizer,
) -> Result<DynamicImage> {
    if !source.is_pdf() {
        if page_index != 0 {
            return Err(PagesmithError::out_of_range(page_index, 1));
        }
        return Ok(ImageProcessor::from_bytes(source.bytes())?.into_dynamic());
    }

    // Render only the page we need.
    let arena = PageArena::from_bytes(source.bytes())?;
    let single = build_from_arena(&arena, &[page_index])?;
    rasterizer
        .rasterize(single.bytes())?
        .into_iter()
        .next()
        .ok_or_else(|| PagesmithError::Rasterizer("rasterizer returned no pages".into()))
}

fn crop_image(
    page: &DynamicImage,
    bbox: &BoundingBox,
    format: RegionImageFormat,
    quality: u8,
) -> Result<BinaryDocument> {
    let (width, height) = (page.width(), page.height());
    let window = bbox.crop_window(f64::from(width), f64::from(height))?;
    let (x, y, crop_w, crop_h) = window.to_pixel_rect(width, height);
    let bytes = ImageProcessor::from_dynamic(page.clone())
        .crop(x, y, crop_w, crop_h)
        .encode(format, quality)?;
    Ok(BinaryDocument::new(bytes, format.document_type()))
}
