// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Search plan constants. Every value here is fixed per ratio band, so the
// same input always produces the same attempt sequence.

use serde::Serialize;

/// Lowest quality the decay loop will try.
pub const MIN_QUALITY: f32 = 0.01;
/// Lowest scale the decay loop will try.
pub const MIN_SCALE: f32 = 0.05;
/// Attempts made at the seed scale before scale starts decaying too.
pub const EARLY_WINDOW: usize = 2;

/// Fixed escalation ladder of `(scale, quality)` pairs, tried in order once
/// the decay loop has used its budget.
pub const LADDER: [(f32, f32); 6] = [
    (0.5, 0.10),
    (0.4, 0.08),
    (0.3, 0.05),
    (0.2, 0.03),
    (0.15, 0.02),
    (0.1, 0.01),
];

/// How far the input is from the ceiling (`current / ceiling`), bucketed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RatioBand {
    /// ratio <= 3
    Mild,
    /// 3 < ratio <= 5
    Moderate,
    /// 5 < ratio <= 8
    Severe,
    /// ratio > 8
    Extreme,
}

impl RatioBand {
    pub fn for_ratio(ratio: f64) -> Self {
        if ratio > 8.0 {
            Self::Extreme
        } else if ratio > 5.0 {
            Self::Severe
        } else if ratio > 3.0 {
            Self::Moderate
        } else {
            Self::Mild
        }
    }

    /// Starting `(quality, scale)`. Extreme ratios skip the hopeless
    /// full-quality attempts.
    pub fn seed(&self) -> (f32, f32) {
        match self {
            Self::Extreme => (0.3, 0.4),
            Self::Severe => (0.5, 0.6),
            Self::Moderate => (0.7, 0.8),
            Self::Mild => (0.9, 1.0),
        }
    }

    /// Maximum decay-loop attempts.
    pub fn attempt_budget(&self) -> usize {
        match self {
            Self::Extreme => 12,
            Self::Severe => 10,
            Self::Moderate => 8,
            Self::Mild => 6,
        }
    }

    /// Multiplier applied to quality after each failed attempt.
    pub fn quality_decay(&self) -> f32 {
        match self {
            Self::Extreme => 0.7,
            Self::Severe => 0.78,
            Self::Moderate => 0.85,
            Self::Mild => 0.9,
        }
    }

    /// Multiplier applied to scale after each failed attempt past the early
    /// window.
    pub fn scale_decay(&self) -> f32 {
        match self {
            Self::Extreme => 0.8,
            Self::Severe => 0.85,
            Self::Moderate => 0.9,
            Self::Mild => 0.95,
        }
    }

    /// Ladder results are accepted up to `target * tolerance` (but never
    /// above the ceiling).
    pub fn tolerance(&self) -> f64 {
        match self {
            Self::Extreme => 1.5,
            Self::Severe => 1.4,
            Self::Moderate => 1.3,
            Self::Mild => 1.2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Severe => "severe",
            Self::Extreme => "extreme",
        }
    }
}

impl std::fmt::Display for RatioBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(RatioBand::for_ratio(20.0), RatioBand::Extreme);
        assert_eq!(RatioBand::for_ratio(8.01), RatioBand::Extreme);
        assert_eq!(RatioBand::for_ratio(8.0), RatioBand::Severe);
        assert_eq!(RatioBand::for_ratio(5.5), RatioBand::Severe);
        assert_eq!(RatioBand::for_ratio(4.0), RatioBand::Moderate);
        assert_eq!(RatioBand::for_ratio(3.0), RatioBand::Mild);
        assert_eq!(RatioBand::for_ratio(0.2), RatioBand::Mild);
    }

    #[test]
    fn seeds_match_bands() {
        assert_eq!(RatioBand::Extreme.seed(), (0.3, 0.4));
        assert_eq!(RatioBand::Severe.seed(), (0.5, 0.6));
        assert_eq!(RatioBand::Moderate.seed(), (0.7, 0.8));
        assert_eq!(RatioBand::Mild.seed(), (0.9, 1.0));
    }

    #[test]
    fn severity_steepens_decay() {
        let bands = [
            RatioBand::Mild,
            RatioBand::Moderate,
            RatioBand::Severe,
            RatioBand::Extreme,
        ];
        for pair in bands.windows(2) {
            assert!(pair[1].quality_decay() < pair[0].quality_decay());
            assert!(pair[1].scale_decay() < pair[0].scale_decay());
            assert!(pair[1].tolerance() > pair[0].tolerance());
            assert!(pair[1].attempt_budget() > pair[0].attempt_budget());
        }
    }

    #[test]
    fn ladder_descends() {
        for pair in LADDER.windows(2) {
            assert!(pair[1].0 < pair[0].0);
            assert!(pair[1].1 < pair[0].1);
        }
    }
}
