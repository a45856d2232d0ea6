// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — the page arena, the paged-document builder, and text runs.

pub mod reader;
pub mod text;
pub mod writer;

pub use reader::PageArena;
pub use writer::{
    DocumentBuilder, apply_page_selection, apply_page_selection_with_gate, build_from_pages,
    raster_to_pdf,
};
