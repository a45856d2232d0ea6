// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Adaptive compressor — rasterizes every page once, then searches downward
// from the requested JPEG quality until the re-encoded pages are small enough
// to be worth a new document.

use image::DynamicImage;
use lopdf::content::Content;
use pagesmith_core::{BinaryDocument, CompressionRequest, PagesmithError, Result};
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::compress::rasterize::{EmbeddedImageRasterizer, PageRasterizer};
use crate::image::processor::jpeg_bytes;
use crate::pdf::reader::PageArena;
use crate::pdf::text::{TextRun, extract_text_runs, has_source_text, overlay_operations};
use crate::pdf::writer::{DocumentBuilder, jpeg_image_stream};

/// Estimated container overhead relative to the encoded page data, at
/// quality 0 and quality 100. Interpolated linearly in between.
pub const OVERHEAD_AT_ZERO_QUALITY: f64 = 0.54;
pub const OVERHEAD_AT_FULL_QUALITY: f64 = 0.18;

/// Quality decrement after a failed attempt, at quality 0 and quality 100.
pub const MIN_QUALITY_STEP: f64 = 1.0;
pub const MAX_QUALITY_STEP: f64 = 10.0;

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// Overhead factor applied to the summed page sizes at `quality`.
pub fn overhead(quality: u8) -> f64 {
    lerp(
        OVERHEAD_AT_ZERO_QUALITY,
        OVERHEAD_AT_FULL_QUALITY,
        f64::from(quality) / 100.0,
    )
}

/// How far quality drops after an attempt at `quality` fails.
pub fn quality_step(quality: u8) -> i32 {
    lerp(MIN_QUALITY_STEP, MAX_QUALITY_STEP, f64::from(quality) / 100.0).round() as i32
}

/// Compress `source` with the built-in rasterizer.
pub fn compress(source: &BinaryDocument, request: &CompressionRequest) -> Result<BinaryDocument> {
    PdfCompressor::default().compress(source, request)
}

/// Rasterize-and-re-encode PDF compressor.
///
/// The result is never larger than the source: when no quality level in
/// `[1, request.quality]` meets the size target, the source comes back
/// unchanged.
pub struct PdfCompressor {
    rasterizer: Box<dyn PageRasterizer>,
}

impl Default for PdfCompressor {
    fn default() -> Self {
        Self::new(EmbeddedImageRasterizer)
    }
}

impl PdfCompressor {
    pub fn new(rasterizer: impl PageRasterizer + 'static) -> Self {
        Self {
            rasterizer: Box::new(rasterizer),
        }
    }

    #[instrument(skip(self, source), fields(bytes_len = source.len(), quality = request.quality))]
    pub fn compress(
        &self,
        source: &BinaryDocument,
        request: &CompressionRequest,
    ) -> Result<BinaryDocument> {
        let start_quality = request.validated_quality()?;
        let arena = PageArena::from_document(source)?;

        if !request.force_text_rewrite && contains_text(&arena) {
            warn!("Document carries searchable text, compression skipped");
            return Ok(source.clone());
        }

        let page_count = arena.page_count();
        let text_runs = if request.disable_source_text {
            vec![Vec::new(); page_count]
        } else {
            extract_text_runs(&arena)?
        };
        let text_bytes = overlay_size(&text_runs)?;

        let pages = self.rasterizer.rasterize(source.bytes())?;
        if pages.len() != page_count {
            return Err(PagesmithError::Rasterizer(format!(
                "rasterizer produced {} pages for a {} page document",
                pages.len(),
                page_count
            )));
        }

        let original_size = source.len() as f64;
        let mut quality = i32::from(start_quality);
        while quality >= 1 {
            let level = quality as u8;
            let encoded = encode_pages(&pages, level)?;
            let total = encoded.iter().map(Vec::len).sum::<usize>() + text_bytes;
            let overhead = overhead(level);

            debug!(quality = level, total, overhead, "Compression attempt");
            if total as f64 * (1.0 + overhead) < original_size {
                let output = assemble(&pages, encoded, &text_runs)?;
                info!(
                    pages = page_count,
                    quality = level,
                    original_bytes = source.len(),
                    compressed_bytes = output.len(),
                    "PDF compressed"
                );
                return Ok(output);
            }
            quality -= quality_step(level);
        }

        warn!(
            original_bytes = source.len(),
            "No quality level shrinks the document, returning it unchanged"
        );
        Ok(source.clone())
    }
}

/// Text guard. A page whose content cannot be parsed counts as text-free.
fn contains_text(arena: &PageArena) -> bool {
    has_source_text(arena).unwrap_or_else(|err| {
        debug!(%err, "Text probe failed");
        false
    })
}

fn overlay_size(text_runs: &[Vec<TextRun>]) -> Result<usize> {
    let mut total = 0;
    for runs in text_runs.iter().filter(|runs| !runs.is_empty()) {
        let operations = overlay_operations(runs);
        let encoded = Content { operations }.encode().map_err(|err| {
            PagesmithError::PdfError(format!("failed to encode text overlay: {}", err))
        })?;
        total += encoded.len();
    }
    Ok(total)
}

fn encode_pages(pages: &[DynamicImage], quality: u8) -> Result<Vec<Vec<u8>>> {
    pages
        .par_iter()
        .enumerate()
        .map(|(index, page)| {
            jpeg_bytes(page, quality).map_err(|err| PagesmithError::Compression {
                page: index,
                reason: err.to_string(),
            })
        })
        .collect()
}

fn assemble(
    pages: &[DynamicImage],
    encoded: Vec<Vec<u8>>,
    text_runs: &[Vec<TextRun>],
) -> Result<BinaryDocument> {
    let mut builder = DocumentBuilder::new();
    for ((page, jpeg), runs) in pages.iter().zip(encoded).zip(text_runs) {
        let (width, height) = (page.width(), page.height());
        let stream = jpeg_image_stream(jpeg, width, height, !page.color().has_color());
        builder.add_image_page(stream, width, height, runs)?;
    }
    builder.finish()
}
