// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decode, crop, downscale, and re-encode raster images.

pub mod compress;
pub mod processor;

pub use compress::compress_image;
pub use processor::ImageProcessor;
