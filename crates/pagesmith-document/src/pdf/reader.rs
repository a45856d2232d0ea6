// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — loads a document into an arena of pages addressed by 0-based
// position, using the `lopdf` crate. Transformations read from one arena and
// write into a fresh document; the arena itself is never mutated.

use lopdf::{Dictionary, Document, Object, ObjectId};
use pagesmith_core::{BinaryDocument, PagesmithError, Result};
use tracing::{debug, instrument};

/// Keys a page may inherit from its ancestors in the page tree.
pub(crate) const INHERITABLE_KEYS: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Letter size, used when neither the page nor its ancestors carry a MediaBox.
const DEFAULT_MEDIA_BOX: [f64; 4] = [0.0, 0.0, 612.0, 792.0];

static NULL_OBJECT: Object = Object::Null;

/// Read-only view of a PDF's pages, indexed by position.
pub struct PageArena {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in document order.
    pages: Vec<ObjectId>,
}

impl PageArena {
    // -- Construction ---------------------------------------------------------

    /// Load an arena from raw PDF bytes.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            PagesmithError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;
        let pages: Vec<ObjectId> = document.get_pages().into_values().collect();

        debug!(pages = pages.len(), "PDF loaded into page arena");
        Ok(Self { document, pages })
    }

    /// Load an arena from a document, rejecting anything that is not a PDF.
    pub fn from_document(source: &BinaryDocument) -> Result<Self> {
        if !source.is_pdf() {
            return Err(PagesmithError::UnsupportedFormat(format!(
                "expected a PDF, got {}",
                source.mime_type()
            )));
        }
        Self::from_bytes(source.bytes())
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the page at `index`.
    pub fn page_id(&self, index: usize) -> Result<ObjectId> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| PagesmithError::out_of_range(index, self.pages.len()))
    }

    /// The page dictionary at `index`.
    pub fn page_dict(&self, index: usize) -> Result<&Dictionary> {
        let page_id = self.page_id(index)?;
        self.document
            .get_object(page_id)
            .and_then(|object| object.as_dict())
            .map_err(|err| {
                PagesmithError::PdfError(format!("page {} is not a dictionary: {}", index, err))
            })
    }

    /// Look up `key` on the page, walking up the page tree for inherited
    /// attributes. The returned object is already dereferenced.
    pub fn inherited(&self, index: usize, key: &[u8]) -> Result<Option<&Object>> {
        let mut dict = self.page_dict(index)?;
        // Guard against malformed trees whose /Parent chain loops.
        for _ in 0..64 {
            if let Ok(value) = dict.get(key) {
                return Ok(Some(resolve(&self.document, value)));
            }
            match dict.get(b"Parent") {
                Ok(parent) => match resolve(&self.document, parent) {
                    Object::Dictionary(parent_dict) => dict = parent_dict,
                    _ => return Ok(None),
                },
                Err(_) => return Ok(None),
            }
        }
        Ok(None)
    }

    /// MediaBox of the page as `[x0, y0, x1, y1]`.
    pub fn media_box(&self, index: usize) -> Result<[f64; 4]> {
        let Some(object) = self.inherited(index, b"MediaBox")? else {
            return Ok(DEFAULT_MEDIA_BOX);
        };
        let Object::Array(values) = object else {
            return Err(PagesmithError::PdfError(format!(
                "page {} has a malformed MediaBox",
                index
            )));
        };
        if values.len() != 4 {
            return Err(PagesmithError::PdfError(format!(
                "page {} MediaBox has {} entries",
                index,
                values.len()
            )));
        }
        let mut rect = [0.0; 4];
        for (slot, value) in rect.iter_mut().zip(values) {
            *slot = number(resolve(&self.document, value)).ok_or_else(|| {
                PagesmithError::PdfError(format!("page {} MediaBox is not numeric", index))
            })?;
        }
        // Normalise so x0 <= x1 and y0 <= y1.
        Ok([
            rect[0].min(rect[2]),
            rect[1].min(rect[3]),
            rect[0].max(rect[2]),
            rect[1].max(rect[3]),
        ])
    }

    /// Page width and height in points.
    pub fn page_size(&self, index: usize) -> Result<(f64, f64)> {
        let [x0, y0, x1, y1] = self.media_box(index)?;
        Ok((x1 - x0, y1 - y0))
    }

    /// Resource dictionary of the page, including inherited resources.
    pub fn resources(&self, index: usize) -> Result<Option<&Dictionary>> {
        Ok(match self.inherited(index, b"Resources")? {
            Some(Object::Dictionary(dict)) => Some(dict),
            _ => None,
        })
    }

    /// Decoded, concatenated content stream(s) of the page.
    pub fn content(&self, index: usize) -> Result<Vec<u8>> {
        let page_id = self.page_id(index)?;
        if self.page_dict(index)?.get(b"Contents").is_err() {
            return Ok(Vec::new());
        }
        self.document.get_page_content(page_id).map_err(|err| {
            PagesmithError::PdfError(format!("cannot read content of page {}: {}", index, err))
        })
    }
}

/// Number of pages in a document; 1 for raster images.
pub fn page_count(source: &BinaryDocument) -> Result<usize> {
    if source.is_pdf() {
        Ok(PageArena::from_bytes(source.bytes())?.page_count())
    } else {
        Ok(1)
    }
}

/// True when every page of the PDF has an empty content stream.
#[instrument(skip_all, fields(bytes_len = source.len()))]
pub fn is_blank(source: &BinaryDocument) -> Result<bool> {
    let arena = PageArena::from_document(source)?;
    for index in 0..arena.page_count() {
        let content = arena.content(index)?;
        if content.iter().any(|byte| !byte.is_ascii_whitespace()) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Follow a reference to the object it points at. Dangling references
/// resolve to `Null`.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> &'a Object {
    let mut current = object;
    for _ in 0..32 {
        match current {
            Object::Reference(id) => match document.get_object(*id) {
                Ok(target) => current = target,
                Err(_) => return &NULL_OBJECT,
            },
            _ => return current,
        }
    }
    &NULL_OBJECT
}

/// Numeric value of an Integer or Real object.
pub(crate) fn number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

/// A PDF transformation matrix `[a b c d e f]`.
pub(crate) type Matrix = [f64; 6];

pub(crate) const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// `a` applied first, then `b` (PDF's row-vector convention).
pub(crate) fn multiply(a: Matrix, b: Matrix) -> Matrix {
    [
        a[0] * b[0] + a[1] * b[2],
        a[0] * b[1] + a[1] * b[3],
        a[2] * b[0] + a[3] * b[2],
        a[2] * b[1] + a[3] * b[3],
        a[4] * b[0] + a[5] * b[2] + b[4],
        a[4] * b[1] + a[5] * b[3] + b[5],
    ]
}

/// Six numeric operands as a matrix (`cm`, `Tm`, or a `/Matrix` array).
pub(crate) fn matrix_operands(operands: &[Object]) -> Option<Matrix> {
    if operands.len() != 6 {
        return None;
    }
    let mut matrix = [0.0; 6];
    for (slot, operand) in matrix.iter_mut().zip(operands) {
        *slot = number(operand)?;
    }
    Some(matrix)
}
