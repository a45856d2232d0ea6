// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extraction module — cut detector-described regions and page groups out of
// a source document into standalone documents.

pub mod region;
pub mod split;

use std::path::{Path, PathBuf};

use pagesmith_core::Result;
use tracing::info;

pub use region::{
    ExtractedImage, ExtractedRegion, extract_region, extract_region_image, extract_region_images,
    extract_regions,
};
pub use split::{AcceptAll, ExtractedGroup, GroupPolicy, StrictConfidence, split, split_with_policy};

/// Write `bytes` to `dir/filename` and return the full path.
fn save_output(dir: &Path, filename: String, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(filename);
    std::fs::write(&path, bytes)?;
    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
