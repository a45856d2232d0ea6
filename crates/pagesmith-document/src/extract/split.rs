// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Group splitter — cuts a multi-page PDF into one sub-document per detected
// page group, each covering the group's full inclusive page range.

use std::path::{Path, PathBuf};

use pagesmith_core::{BinaryDocument, PageGroup, PagesmithError, Result};
use tracing::{debug, info, instrument, warn};

use crate::extract::save_output;
use crate::pdf::reader::PageArena;
use crate::pdf::writer::build_from_arena;

/// Decides which detected groups become sub-documents.
pub trait GroupPolicy {
    fn accept(&self, group: &PageGroup) -> bool;
}

/// Keeps every group.
#[derive(Debug, Default, Clone, Copy)]
pub struct AcceptAll;

impl GroupPolicy for AcceptAll {
    fn accept(&self, _group: &PageGroup) -> bool {
        true
    }
}

/// Keeps only groups the detector is fully confident in.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrictConfidence;

impl GroupPolicy for StrictConfidence {
    fn accept(&self, group: &PageGroup) -> bool {
        group.confidence == 1.0
    }
}

impl<F> GroupPolicy for F
where
    F: Fn(&PageGroup) -> bool,
{
    fn accept(&self, group: &PageGroup) -> bool {
        self(group)
    }
}

/// A contiguous page range cut out of the source document.
#[derive(Debug, Clone)]
pub struct ExtractedGroup {
    document: BinaryDocument,
    page_id_min: usize,
    page_id_max: usize,
}

impl ExtractedGroup {
    pub fn document(&self) -> &BinaryDocument {
        &self.document
    }

    pub fn into_document(self) -> BinaryDocument {
        self.document
    }

    pub fn bytes(&self) -> &[u8] {
        self.document.bytes()
    }

    /// First source page in the group.
    pub fn page_id_min(&self) -> usize {
        self.page_id_min
    }

    /// Last source page in the group (inclusive).
    pub fn page_id_max(&self) -> usize {
        self.page_id_max
    }

    /// Suggested file name, `{subject}_p{min}-{max}.pdf`.
    pub fn filename(&self, subject: &str) -> String {
        format!("{}_p{}-{}.pdf", subject, self.page_id_min, self.page_id_max)
    }

    pub fn save_to_dir(&self, dir: impl AsRef<Path>, subject: &str) -> Result<PathBuf> {
        save_output(dir.as_ref(), self.filename(subject), self.bytes())
    }
}

/// Split `source` into one document per group. With `strict`, groups whose
/// confidence is not exactly 1 are skipped.
pub fn split(
    source: &BinaryDocument,
    groups: &[PageGroup],
    strict: bool,
) -> Result<Vec<ExtractedGroup>> {
    if strict {
        split_with_policy(source, groups, &StrictConfidence)
    } else {
        split_with_policy(source, groups, &AcceptAll)
    }
}

/// Split `source` into one document per group accepted by `policy`, in group
/// order.
///
/// Fails with `UnsupportedDocument` unless `source` is a PDF of at least two
/// pages, and with `IndexOutOfRange` when a group reaches past the last page
/// (the detector ran on a different revision of the file).
#[instrument(skip_all, fields(bytes_len = source.len(), groups = groups.len()))]
pub fn split_with_policy(
    source: &BinaryDocument,
    groups: &[PageGroup],
    policy: &dyn GroupPolicy,
) -> Result<Vec<ExtractedGroup>> {
    if !source.is_pdf() {
        return Err(PagesmithError::UnsupportedDocument(format!(
            "cannot split a {} document",
            source.mime_type()
        )));
    }
    let arena = PageArena::from_bytes(source.bytes())?;
    let page_count = arena.page_count();
    if page_count < 2 {
        return Err(PagesmithError::UnsupportedDocument(format!(
            "cannot split a document of {} page(s)",
            page_count
        )));
    }

    let mut outputs = Vec::new();
    for (position, group) in groups.iter().enumerate() {
        if !policy.accept(group) {
            debug!(group = position, confidence = group.confidence, "Group rejected by policy");
            continue;
        }
        let Some((min, max)) = group.range() else {
            warn!(group = position, "Group lists no pages, skipped");
            continue;
        };
        if max >= page_count {
            return Err(PagesmithError::out_of_range(max, page_count));
        }

        let pages: Vec<usize> = (min..=max).collect();
        outputs.push(ExtractedGroup {
            document: build_from_arena(&arena, &pages)?,
            page_id_min: min,
            page_id_max: max,
        });
    }

    info!(
        page_count,
        requested = groups.len(),
        produced = outputs.len(),
        "Document split into groups"
    );
    Ok(outputs)
}
