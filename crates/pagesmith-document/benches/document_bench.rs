// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the pagesmith-document crate: region extraction
// and adaptive compression on a synthetic scanned page.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use pagesmith_core::{BinaryDocument, BoundingBox, CompressionRequest};
use pagesmith_document::{ImageProcessor, compress, extract_region, raster_to_pdf};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 600x800 "scan": light background with darker text-like bands.
fn synthetic_scan() -> BinaryDocument {
    let (width, height) = (600u32, 800u32);
    let image = RgbImage::from_fn(width, height, |x, y| {
        let band = (y / 12) % 3 == 0 && x > 40 && x < width - 40;
        let base: u8 = if band { 60 } else { 235 };
        let shade = base + ((x * 7 + y * 13) % 9) as u8;
        Rgb([shade, shade, shade])
    });
    let png = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(image))
        .to_png_bytes()
        .expect("encode PNG fixture");
    let source = BinaryDocument::sniffed(png).expect("sniff PNG fixture");
    raster_to_pdf(&source).expect("wrap PNG fixture")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Crop the middle of the page into a standalone single-page PDF.
fn bench_region_extraction(c: &mut Criterion) {
    let pdf = synthetic_scan();
    let bbox = BoundingBox::new(0.1, 0.6, 0.2, 0.7);

    c.bench_function("extract_region (600x800 scan)", |b| {
        b.iter(|| {
            let region = extract_region(black_box(&pdf), 0, black_box(&bbox))
                .expect("region extraction");
            black_box(region);
        });
    });
}

/// Full compression search starting at quality 85.
fn bench_compression(c: &mut Criterion) {
    let pdf = synthetic_scan();
    let request = CompressionRequest::new(85);

    c.bench_function("compress (600x800 scan, q85)", |b| {
        b.iter(|| {
            let output = compress(black_box(&pdf), black_box(&request)).expect("compression");
            black_box(output);
        });
    });
}

criterion_group!(benches, bench_region_extraction, bench_compression);
criterion_main!(benches);
