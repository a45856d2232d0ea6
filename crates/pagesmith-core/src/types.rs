// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Pagesmith.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{PagesmithError, Result};

/// Supported input document types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    Jpeg,
    Png,
    Tiff,
    Webp,
    Bmp,
}

impl DocumentType {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }

    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "tif" | "tiff" => Some(Self::Tiff),
            "webp" => Some(Self::Webp),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Infer document type from a declared MIME type.
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime.trim().to_ascii_lowercase().as_str() {
            "application/pdf" => Some(Self::Pdf),
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/tiff" => Some(Self::Tiff),
            "image/webp" => Some(Self::Webp),
            "image/bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Detect the type from the leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(Self::Tiff)
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if bytes.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    /// Whether this type is a paged binary format.
    pub fn is_paged(&self) -> bool {
        matches!(self, Self::Pdf)
    }
}

/// An immutable in-memory document: raw bytes plus their declared type.
///
/// Every transformation in the engine produces a new `BinaryDocument`; none
/// mutate one in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDocument {
    bytes: Vec<u8>,
    document_type: DocumentType,
}

impl BinaryDocument {
    /// Wrap bytes whose type is already known.
    pub fn new(bytes: Vec<u8>, document_type: DocumentType) -> Self {
        Self {
            bytes,
            document_type,
        }
    }

    /// Wrap bytes with a declared MIME type.
    pub fn from_bytes(bytes: Vec<u8>, mime: &str) -> Result<Self> {
        let document_type = DocumentType::from_mime(mime)
            .ok_or_else(|| PagesmithError::UnsupportedFormat(mime.to_string()))?;
        Ok(Self::new(bytes, document_type))
    }

    /// Wrap bytes, detecting the type from their magic number.
    pub fn sniffed(bytes: Vec<u8>) -> Result<Self> {
        let document_type = DocumentType::sniff(&bytes).ok_or_else(|| {
            PagesmithError::UnsupportedFormat("unrecognised file signature".into())
        })?;
        Ok(Self::new(bytes, document_type))
    }

    /// Read a document from the filesystem. The type comes from the magic
    /// bytes, falling back to the file extension.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let bytes = std::fs::read(path_ref)?;

        let document_type = DocumentType::sniff(&bytes)
            .or_else(|| {
                path_ref
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .and_then(DocumentType::from_extension)
            })
            .ok_or_else(|| {
                PagesmithError::UnsupportedFormat(format!(
                    "cannot determine type of {}",
                    path_ref.display()
                ))
            })?;

        debug!(bytes_len = bytes.len(), ?document_type, "Document read");
        Ok(Self::new(bytes, document_type))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn mime_type(&self) -> &'static str {
        self.document_type.mime_type()
    }

    pub fn is_pdf(&self) -> bool {
        self.document_type.is_paged()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What a [`PageSelection`] does with the pages it names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageOperation {
    /// Keep only the named pages.
    KeepOnly,
    /// Drop the named pages, keep the rest.
    Remove,
}

/// A request to keep or remove pages, gated on a minimum page count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSelection {
    /// Requested indexes; negative values count back from the last page.
    pub page_indexes: Vec<i64>,
    pub operation: PageOperation,
    /// The selection only applies to documents with at least this many pages.
    #[serde(default)]
    pub min_page_count: usize,
}

impl PageSelection {
    pub fn keep_only(page_indexes: impl Into<Vec<i64>>) -> Self {
        Self {
            page_indexes: page_indexes.into(),
            operation: PageOperation::KeepOnly,
            min_page_count: 0,
        }
    }

    pub fn remove(page_indexes: impl Into<Vec<i64>>) -> Self {
        Self {
            page_indexes: page_indexes.into(),
            operation: PageOperation::Remove,
            min_page_count: 0,
        }
    }

    pub fn with_min_page_count(mut self, min_page_count: usize) -> Self {
        self.min_page_count = min_page_count;
        self
    }
}

/// A detector-supplied run of pages that forms one logical sub-document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageGroup {
    pub page_indexes: Vec<usize>,
    #[serde(default = "full_confidence")]
    pub confidence: f64,
}

fn full_confidence() -> f64 {
    1.0
}

impl PageGroup {
    pub fn new(page_indexes: impl Into<Vec<usize>>, confidence: f64) -> Self {
        Self {
            page_indexes: page_indexes.into(),
            confidence,
        }
    }

    /// Inclusive `(min, max)` range covered by the group, `None` when empty.
    pub fn range(&self) -> Option<(usize, usize)> {
        let min = self.page_indexes.iter().copied().min()?;
        let max = self.page_indexes.iter().copied().max()?;
        Some((min, max))
    }
}

/// Parameters for the adaptive compressor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionRequest {
    /// Starting quality, 1-100.
    pub quality: u8,
    /// Compress even when the document carries extractable text.
    #[serde(default)]
    pub force_text_rewrite: bool,
    /// Drop source text instead of redrawing it over the raster pages.
    #[serde(default = "default_true")]
    pub disable_source_text: bool,
}

fn default_true() -> bool {
    true
}

impl CompressionRequest {
    pub fn new(quality: u8) -> Self {
        Self {
            quality,
            force_text_rewrite: false,
            disable_source_text: true,
        }
    }

    /// Return the quality if it lies in `[1, 100]`.
    pub fn validated_quality(&self) -> Result<u8> {
        if (1..=100).contains(&self.quality) {
            Ok(self.quality)
        } else {
            Err(PagesmithError::InvalidQuality(self.quality))
        }
    }
}

impl Default for CompressionRequest {
    fn default() -> Self {
        Self::new(85)
    }
}

/// Encoding for regions extracted as raster images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionImageFormat {
    Jpeg,
    Png,
}

impl RegionImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
        }
    }

    pub fn document_type(&self) -> DocumentType {
        match self {
            Self::Jpeg => DocumentType::Jpeg,
            Self::Png => DocumentType::Png,
        }
    }
}
