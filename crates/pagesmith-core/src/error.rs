// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Pagesmith.

use thiserror::Error;

/// Top-level error type for all Pagesmith operations.
#[derive(Debug, Error)]
pub enum PagesmithError {
    // -- Geometry and selection --
    #[error("invalid geometry: {0}")]
    Geometry(String),

    #[error("page index {index} is out of range for a document of {page_count} pages")]
    IndexOutOfRange { index: i64, page_count: usize },

    #[error("page selection would remove every page of the document")]
    EmptySelection,

    // -- Document format --
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("unsupported document: {0}")]
    UnsupportedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Compression --
    #[error("compression failed on page {page}: {reason}")]
    Compression { page: usize, reason: String },

    #[error("quality must be between 1 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("rasterizer failed: {0}")]
    Rasterizer(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PagesmithError {
    /// Shorthand for an out-of-range error on an unsigned page index.
    pub fn out_of_range(index: usize, page_count: usize) -> Self {
        Self::IndexOutOfRange {
            index: index as i64,
            page_count,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, PagesmithError>;
