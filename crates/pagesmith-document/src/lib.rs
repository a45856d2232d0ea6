// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// pagesmith-document — binary document reconstruction for Pagesmith.
//
// Provides the PDF page arena and paged-document builder (page selection,
// reordering, raster wrapping), region extraction, group splitting, adaptive
// rasterize-and-re-encode compression, and raster image compression.

pub mod compress;
pub mod extract;
pub mod image;
pub mod pdf;

#[cfg(test)]
mod testing;

// Re-export the primary entry points so callers can use
// `pagesmith_document::split` etc.
pub use compress::{EmbeddedImageRasterizer, PageRasterizer, PdfCompressor, compress};
pub use extract::{
    ExtractedGroup, ExtractedImage, ExtractedRegion, GroupPolicy, extract_region,
    extract_region_image, extract_region_images, extract_regions, split, split_with_policy,
};
pub use crate::image::{ImageProcessor, compress_image};
pub use pdf::reader::{is_blank, page_count};
pub use pdf::{
    DocumentBuilder, PageArena, apply_page_selection, apply_page_selection_with_gate,
    build_from_pages, raster_to_pdf,
};

#[cfg(feature = "pdfium")]
pub use compress::PdfiumRasterizer;
