// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Engine configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::Result;
use crate::types::{CompressionRequest, RegionImageFormat};

/// Default behaviour for the document engine. Missing JSON fields fall back to
/// [`EngineConfig::default`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Starting JPEG quality for PDF compression (1-100).
    pub default_quality: u8,
    /// Compress PDFs even when they carry extractable text.
    pub force_text_rewrite: bool,
    /// Drop source text rather than redrawing it over compressed pages.
    pub disable_source_text: bool,
    /// Only split out page groups the detector is fully confident about.
    pub strict_groups: bool,
    /// Encoding for regions extracted as images.
    pub region_image_format: RegionImageFormat,
    /// JPEG quality for regions extracted as images.
    pub region_image_quality: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_quality: 85,
            force_text_rewrite: false,
            disable_source_text: true,
            strict_groups: false,
            region_image_format: RegionImageFormat::Jpeg,
            region_image_quality: 90,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json(&raw)?;
        debug!(?config, "Engine configuration loaded");
        Ok(config)
    }

    /// Compression parameters derived from this configuration.
    pub fn compression_request(&self) -> CompressionRequest {
        CompressionRequest {
            quality: self.default_quality,
            force_text_rewrite: self.force_text_rewrite,
            disable_source_text: self.disable_source_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"strict_groups": true, "region_image_format": "png"}"#)
            .unwrap();
        assert!(config.strict_groups);
        assert_eq!(config.region_image_format, RegionImageFormat::Png);
        assert_eq!(config.default_quality, 85);
        assert!(config.disable_source_text);
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pagesmith.json");
        std::fs::write(&path, r#"{"default_quality": 40, "force_text_rewrite": true}"#).unwrap();

        let request = EngineConfig::load(&path).unwrap().compression_request();
        assert_eq!(request.quality, 40);
        assert!(request.force_text_rewrite);
        assert!(request.disable_source_text);
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert!(matches!(err, crate::PagesmithError::Serialization(_)));
    }
}
