// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocfitError, Result};

/// Quality thresholds (in percent) that trigger operator review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewThresholds {
    /// Below this, an advisory review is raised.
    pub caution_percent: u8,
    /// Below this, review is mandatory before the artifact may be used.
    pub mandatory_percent: u8,
}

impl Default for ReviewThresholds {
    fn default() -> Self {
        Self {
            caution_percent: 90,
            mandatory_percent: 50,
        }
    }
}

/// Tunables for one `Transformer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Fraction of the ceiling the compressor aims for, leaving headroom
    /// against downstream size drift.
    pub target_fraction: f64,
    /// Inputs larger than this get a coarse pre-compression pass.
    pub precompress_floor_bytes: u64,
    /// Hard limit on a single image decode.
    pub decode_timeout_secs: u64,
    /// Quality for plain format conversions (0.0–1.0).
    pub conversion_quality: f32,
    pub review: ReviewThresholds,
    /// Landing below this fraction of the target after escalation counts as
    /// overcompression.
    pub overcompression_fraction: f64,
    /// Page size of produced documents.
    pub paper_size: crate::PaperSize,
    /// Page margin in points for ordinary images.
    pub standard_margin_pt: f32,
    /// Page margin in points for ID cards and certificates.
    pub compact_margin_pt: f32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_fraction: 0.85,
            precompress_floor_bytes: 5 * 1024 * 1024,
            decode_timeout_secs: 10,
            conversion_quality: 0.92,
            review: ReviewThresholds::default(),
            overcompression_fraction: 0.5,
            paper_size: crate::PaperSize::A4,
            standard_margin_pt: 36.0,
            compact_margin_pt: 14.0,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.target_fraction > 0.0 && self.target_fraction <= 1.0) {
            return Err(DocfitError::InvalidConfig(format!(
                "target_fraction {} must be in (0, 1]",
                self.target_fraction
            )));
        }
        if !(self.overcompression_fraction > 0.0 && self.overcompression_fraction <= 1.0) {
            return Err(DocfitError::InvalidConfig(format!(
                "overcompression_fraction {} must be in (0, 1]",
                self.overcompression_fraction
            )));
        }
        if !(self.conversion_quality > 0.0 && self.conversion_quality <= 1.0) {
            return Err(DocfitError::InvalidConfig(format!(
                "conversion_quality {} must be in (0, 1]",
                self.conversion_quality
            )));
        }
        if self.review.mandatory_percent > self.review.caution_percent {
            return Err(DocfitError::InvalidConfig(format!(
                "mandatory review threshold {}% is above the caution threshold {}%",
                self.review.mandatory_percent, self.review.caution_percent
            )));
        }
        if self.decode_timeout_secs == 0 {
            return Err(DocfitError::InvalidConfig("decode_timeout_secs must be non-zero".into()));
        }
        if self.standard_margin_pt < 0.0 || self.compact_margin_pt < 0.0 {
            return Err(DocfitError::InvalidConfig("margins must not be negative".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.review.caution_percent, 90);
        assert_eq!(config.review.mandatory_percent, 50);
        assert_eq!(config.precompress_floor_bytes, 5 * 1024 * 1024);
    }

    #[test]
    fn inverted_thresholds_rejected() {
        let config = PipelineConfig {
            review: ReviewThresholds {
                caution_percent: 40,
                mandatory_percent: 60,
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DocfitError::InvalidConfig(_))));
    }

    #[test]
    fn loads_partial_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_fraction": 0.8, "paper_size": "Letter" }}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert!((config.target_fraction - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.paper_size, crate::PaperSize::Letter);
        assert_eq!(config.decode_timeout_secs, 10);
    }

    #[test]
    fn out_of_range_fraction_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target_fraction": 1.5 }}"#).unwrap();
        assert!(PipelineConfig::from_json_file(file.path()).is_err());
    }
}
