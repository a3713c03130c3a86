// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quality disclosure gate.
//
// Decides whether a compliant but degraded encode needs a human to look at
// it before upload, and builds the message shown to them.

use tracing::{info, warn};

use docfit_core::human_errors::format_size;
use docfit_core::{Artifact, QualityDisclosure, ReviewThresholds, ReviewTier};

/// Verdict of [`DisclosureGate::disclose`].
#[derive(Debug)]
pub enum GateVerdict {
    /// Quality is high enough; the artifact is handed back untouched.
    Clear(Artifact),
    Review(QualityDisclosure),
}

#[derive(Debug, Clone, Copy)]
pub struct DisclosureGate {
    thresholds: ReviewThresholds,
}

impl DisclosureGate {
    pub fn new(thresholds: ReviewThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> ReviewThresholds {
        self.thresholds
    }

    /// Review tier for an encode at `quality_percent`, or `None` when the
    /// quality is high enough to use without review.
    pub fn assess(&self, quality_percent: u8) -> Option<ReviewTier> {
        if quality_percent < self.thresholds.mandatory_percent {
            Some(ReviewTier::Mandatory)
        } else if quality_percent < self.thresholds.caution_percent {
            Some(ReviewTier::Advisory)
        } else {
            None
        }
    }

    /// Wrap `preview` in a disclosure if its quality calls for one.
    ///
    /// `scale` is the resample factor the encode used; a value below 1.0 is
    /// mentioned since lost resolution matters for text legibility.
    pub fn disclose(
        &self,
        preview: Artifact,
        quality_percent: u8,
        max_size_bytes: u64,
        scale: f32,
    ) -> GateVerdict {
        let Some(tier) = self.assess(quality_percent) else {
            return GateVerdict::Clear(preview);
        };

        let achieved = preview.size_bytes();
        let mut message = format!(
            "To fit under {}, this document was saved at {}% quality ({}).",
            format_size(max_size_bytes),
            quality_percent,
            format_size(achieved),
        );
        if scale < 1.0 {
            message.push_str(&format!(
                " The image was also reduced to {:.0}% of its original resolution.",
                scale * 100.0
            ));
        }
        match tier {
            ReviewTier::Mandatory => {
                message.push_str(
                    " Check that all text and photos are still readable before uploading it.",
                );
                warn!(quality_percent, achieved, "Mandatory quality review raised");
            }
            ReviewTier::Advisory => {
                message.push_str(" You may want to preview it before uploading.");
                info!(quality_percent, achieved, "Advisory quality review raised");
            }
        }

        GateVerdict::Review(QualityDisclosure {
            quality_percent,
            achieved_size_bytes: achieved,
            max_size_bytes,
            preview,
            tier,
            message,
        })
    }
}

impl Default for DisclosureGate {
    fn default() -> Self {
        Self::new(ReviewThresholds::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfit_core::MediaType;

    #[test]
    fn threshold_boundaries() {
        let gate = DisclosureGate::default();
        assert_eq!(gate.assess(1), Some(ReviewTier::Mandatory));
        assert_eq!(gate.assess(49), Some(ReviewTier::Mandatory));
        assert_eq!(gate.assess(50), Some(ReviewTier::Advisory));
        assert_eq!(gate.assess(89), Some(ReviewTier::Advisory));
        assert_eq!(gate.assess(90), None);
        assert_eq!(gate.assess(100), None);
    }

    #[test]
    fn high_quality_passes_artifact_back() {
        let gate = DisclosureGate::default();
        let artifact = Artifact::new(vec![0; 10], MediaType::Pdf, "a.pdf");
        match gate.disclose(artifact, 95, 100, 1.0) {
            GateVerdict::Clear(returned) => assert_eq!(returned.size_bytes(), 10),
            GateVerdict::Review(disclosure) => panic!("unexpected review: {disclosure:?}"),
        }
    }

    #[test]
    fn mandatory_message_names_sizes_and_scale() {
        let gate = DisclosureGate::default();
        let artifact = Artifact::new(vec![0; 150 * 1024], MediaType::Pdf, "marksheet.pdf");
        let GateVerdict::Review(disclosure) = gate.disclose(artifact, 30, 200 * 1024, 0.6) else {
            panic!("expected a review");
        };

        assert!(disclosure.mandatory_review());
        assert_eq!(disclosure.achieved_size_bytes, 150 * 1024);
        assert!(disclosure.message.contains("200 KB"));
        assert!(disclosure.message.contains("30%"));
        assert!(disclosure.message.contains("60%"));
        assert_eq!(disclosure.preview.display_name(), "marksheet.pdf");
    }

    #[test]
    fn advisory_message_without_scale_note() {
        let gate = DisclosureGate::default();
        let artifact = Artifact::new(vec![0; 1024], MediaType::Pdf, "a.pdf");
        let GateVerdict::Review(disclosure) = gate.disclose(artifact, 70, 2048, 1.0) else {
            panic!("expected a review");
        };
        assert_eq!(disclosure.tier, ReviewTier::Advisory);
        assert!(!disclosure.mandatory_review());
        assert!(!disclosure.message.contains("resolution"));
    }

    #[test]
    fn custom_thresholds() {
        let gate = DisclosureGate::new(ReviewThresholds {
            caution_percent: 70,
            mandatory_percent: 20,
        });
        assert_eq!(gate.assess(75), None);
        assert_eq!(gate.assess(60), Some(ReviewTier::Advisory));
        assert_eq!(gate.assess(10), Some(ReviewTier::Mandatory));
    }
}
