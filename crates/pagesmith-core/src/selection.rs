// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selector — turns a keep/remove request with signed indexes into the
// concrete, ascending list of pages that survive.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::error::{PagesmithError, Result};
use crate::types::{PageOperation, PageSelection};

/// Decides whether a selection applies to a document at all.
pub trait PageGate {
    fn applies(&self, page_count: usize) -> bool;
}

/// Applies only to documents with at least the wrapped number of pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinPageCount(pub usize);

impl PageGate for MinPageCount {
    fn applies(&self, page_count: usize) -> bool {
        page_count >= self.0
    }
}

impl<F> PageGate for F
where
    F: Fn(usize) -> bool,
{
    fn applies(&self, page_count: usize) -> bool {
        self(page_count)
    }
}

/// Resolve `selection` against a document of `page_count` pages, gated on the
/// selection's own `min_page_count`.
pub fn resolve(page_count: usize, selection: &PageSelection) -> Result<Vec<usize>> {
    resolve_with_gate(page_count, selection, &MinPageCount(selection.min_page_count))
}

/// Resolve `selection` with a caller-supplied gate.
///
/// When the gate rejects the document every index is returned unchanged.
pub fn resolve_with_gate(
    page_count: usize,
    selection: &PageSelection,
    gate: &dyn PageGate,
) -> Result<Vec<usize>> {
    Ok(resolve_gated(page_count, selection, gate)?.unwrap_or_else(|| (0..page_count).collect()))
}

/// Like [`resolve_with_gate`], but `None` when the gate rejects the document,
/// so callers can pass the document through untouched.
pub fn resolve_gated(
    page_count: usize,
    selection: &PageSelection,
    gate: &dyn PageGate,
) -> Result<Option<Vec<usize>>> {
    if !gate.applies(page_count) {
        warn!(
            page_count,
            min_page_count = selection.min_page_count,
            "Page selection gated out, keeping all pages"
        );
        return Ok(None);
    }

    let requested = selection
        .page_indexes
        .iter()
        .map(|&index| normalize_index(index, page_count))
        .collect::<Result<BTreeSet<usize>>>()?;

    let retained: Vec<usize> = match selection.operation {
        PageOperation::KeepOnly => requested.into_iter().collect(),
        PageOperation::Remove => (0..page_count)
            .filter(|index| !requested.contains(index))
            .collect(),
    };

    if retained.is_empty() {
        return Err(PagesmithError::EmptySelection);
    }

    debug!(
        page_count,
        operation = ?selection.operation,
        retained = retained.len(),
        "Page selection resolved"
    );
    Ok(Some(retained))
}

/// Map a possibly-negative index onto `[0, page_count)`.
pub fn normalize_index(index: i64, page_count: usize) -> Result<usize> {
    let count = page_count as i64;
    let normalized = if index < 0 { count + index } else { index };
    if normalized < 0 || normalized >= count {
        return Err(PagesmithError::IndexOutOfRange { index, page_count });
    }
    Ok(normalized as usize)
}
