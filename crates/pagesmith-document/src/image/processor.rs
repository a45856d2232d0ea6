// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, crop, downscale, and re-encode in-memory images
// using the `image` crate.

use image::{DynamicImage, ImageFormat};
use pagesmith_core::{PagesmithError, RegionImageFormat, Result};
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// All operations are non-destructive: each method consumes `self` and returns a
/// new `ImageProcessor` wrapping the transformed image, enabling method chaining.
///
/// ```ignore
/// let jpeg = ImageProcessor::from_bytes(&scan)?
///     .crop(100, 400, 500, 1000)
///     .fit_within(Some(800), None)
///     .to_jpeg_bytes(80)?;
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            PagesmithError::ImageError(format!("failed to decode image: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    /// Current image width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Current image height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Crop a rectangular region from the image.
    ///
    /// `x` and `y` are the top-left corner; `width` and `height` define the
    /// size of the crop rectangle. Values are clamped to image bounds.
    #[instrument(skip(self), fields(x, y, width, height))]
    pub fn crop(self, x: u32, y: u32, width: u32, height: u32) -> Self {
        let img_w = self.image.width();
        let img_h = self.image.height();

        let safe_x = x.min(img_w.saturating_sub(1));
        let safe_y = y.min(img_h.saturating_sub(1));
        let safe_w = width.min(img_w - safe_x);
        let safe_h = height.min(img_h - safe_y);

        debug!(safe_x, safe_y, safe_w, safe_h, "Cropping image");

        let cropped = self.image.crop_imm(safe_x, safe_y, safe_w, safe_h);
        Self { image: cropped }
    }

    /// Downscale so the image fits within the given bounds, preserving aspect
    /// ratio. Never upscales; `None` leaves that axis unbounded.
    #[instrument(skip(self), fields(max_width, max_height))]
    pub fn fit_within(self, max_width: Option<u32>, max_height: Option<u32>) -> Self {
        let (width, height) = (self.image.width(), self.image.height());
        let bound_w = max_width.unwrap_or(width).min(width).max(1);
        let bound_h = max_height.unwrap_or(height).min(height).max(1);
        if bound_w == width && bound_h == height {
            return self;
        }
        let resized = self
            .image
            .resize(bound_w, bound_h, image::imageops::FilterType::Lanczos3);
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Downscale complete"
        );
        Self { image: resized }
    }

    /// Resize the image to exactly `width` x `height`, ignoring aspect ratio.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        if self.image.width() == width && self.image.height() == height {
            return self;
        }
        let resized =
            self.image
                .resize_exact(width, height, image::imageops::FilterType::Triangle);
        Self { image: resized }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    ///
    /// Grayscale images stay single-channel; everything else becomes RGB.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        jpeg_bytes(&self.image, quality)
    }

    /// Encode in the requested region format.
    pub fn encode(&self, format: RegionImageFormat, quality: u8) -> Result<Vec<u8>> {
        match format {
            RegionImageFormat::Jpeg => self.to_jpeg_bytes(quality),
            RegionImageFormat::Png => self.to_png_bytes(),
        }
    }
}

/// JPEG-encode `image` at `quality`, borrowing rather than consuming it.
pub(crate) fn jpeg_bytes(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
    let written = if image.color().has_color() {
        image.to_rgb8().write_with_encoder(encoder)
    } else {
        image.to_luma8().write_with_encoder(encoder)
    };
    written.map_err(|err| PagesmithError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| PagesmithError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}
