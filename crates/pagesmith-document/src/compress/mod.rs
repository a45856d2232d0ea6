// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression module — adaptive PDF recompression and the page rasterizers it
// runs on.

pub mod adaptive;
pub mod rasterize;

pub use adaptive::{PdfCompressor, compress};
pub use rasterize::{EmbeddedImageRasterizer, PageRasterizer};

#[cfg(feature = "pdfium")]
pub use rasterize::PdfiumRasterizer;
