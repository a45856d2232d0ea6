// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pagesmith — core types, normalized geometry, page selection, and error
// definitions shared across all crates.

pub mod config;
pub mod error;
pub mod geometry;
pub mod selection;
pub mod types;

pub use config::EngineConfig;
pub use error::{PagesmithError, Result};
pub use geometry::{BoundingBox, CropWindow, NormalizedPolygon, Point};
pub use selection::{MinPageCount, PageGate};
pub use types::*;
