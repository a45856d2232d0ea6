// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raster compression — downscale to optional bounds and re-encode as JPEG.

use pagesmith_core::{BinaryDocument, CompressionRequest, DocumentType, PagesmithError, Result};
use tracing::{info, instrument};

use crate::image::processor::ImageProcessor;

/// Re-encode a raster image as JPEG at `quality`, first shrinking it to fit
/// `max_width` x `max_height` when given.
///
/// The source is returned unchanged when the result would not be smaller.
#[instrument(skip(source), fields(bytes_len = source.len()))]
pub fn compress_image(
    source: &BinaryDocument,
    quality: u8,
    max_width: Option<u32>,
    max_height: Option<u32>,
) -> Result<BinaryDocument> {
    if source.is_pdf() {
        return Err(PagesmithError::UnsupportedFormat(
            "compress_image expects a raster image".into(),
        ));
    }
    let quality = CompressionRequest::new(quality).validated_quality()?;

    let processor = ImageProcessor::from_bytes(source.bytes())?.fit_within(max_width, max_height);
    let encoded = processor.to_jpeg_bytes(quality)?;

    info!(
        original_bytes = source.len(),
        compressed_bytes = encoded.len(),
        quality,
        width = processor.width(),
        height = processor.height(),
        "Image re-encoded"
    );

    if encoded.len() < source.len() {
        Ok(BinaryDocument::new(encoded, DocumentType::Jpeg))
    } else {
        Ok(source.clone())
    }
}
