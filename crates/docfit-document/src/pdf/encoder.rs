// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document encoder — wraps a raster in a single-page PDF under a byte
// ceiling.
//
// The JPEG payload is the only part of the document that can shrink, so the
// encoder searches the embedded JPEG's (quality, scale) while measuring the
// size of the whole serialised document. The page layout is computed once
// from the source size and does not move as resolution drops.

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use docfit_core::error::{DocfitError, Result};
use docfit_core::{Artifact, MediaType, PaperSize, PipelineConfig, QualityDisclosure};

use super::layout::{MarginProfile, Margins, Placement, margin_profile, place_image};
use super::writer::{JpegImage, PdfWriter};
use crate::compress::{Attempt, Landing, SearchPhase, SizeGoal, TrialEncoder};
use crate::disclosure::{DisclosureGate, GateVerdict};
use crate::image::processor::{is_grayscale, quality_percent};

/// Qualities tried at full resolution, best first.
const QUALITY_SWEEP: [f32; 12] = [0.95, 0.9, 0.85, 0.8, 0.75, 0.7, 0.6, 0.5, 0.4, 0.3, 0.2, 0.1];
/// Coarse scales for the fallback ladder.
const LADDER_SCALES: [f32; 5] = [0.8, 0.6, 0.45, 0.3, 0.2];
/// Qualities tried at each ladder scale.
const LADDER_QUALITIES: [f32; 5] = [0.8, 0.6, 0.4, 0.25, 0.1];

/// What the encoder needs to know about the document being built.
#[derive(Debug, Clone, Copy)]
pub struct DocumentRequest<'a> {
    /// Display name of the finished artifact.
    pub display_name: &'a str,
    /// Free text consulted when choosing margins (original file name,
    /// document type).
    pub layout_hint: &'a str,
    /// Size of the artifact being replaced.
    pub current_size: u64,
    pub goal: SizeGoal,
}

/// How the accepted document was produced.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub quality: f32,
    pub scale: f32,
    /// Pixel size of the embedded image.
    pub width: u32,
    pub height: u32,
    pub margin_profile: &'static str,
    pub landing: Landing,
    /// The coarse-scale ladder was needed.
    pub escalated: bool,
    /// The target was never met; the first document under the ceiling was used.
    pub used_fallback: bool,
    pub overcompressed: bool,
    pub attempts: Vec<Attempt>,
}

impl DocumentReport {
    pub fn quality_percent(&self) -> u8 {
        quality_percent(self.quality)
    }
}

#[derive(Debug)]
pub enum DocumentOutcome {
    /// The document fits and its quality needs no review.
    Compliant {
        artifact: Artifact,
        report: DocumentReport,
    },
    /// The document fits but was degraded enough to need a human look.
    NeedsReview {
        disclosure: QualityDisclosure,
        report: DocumentReport,
    },
}

impl DocumentOutcome {
    pub fn report(&self) -> &DocumentReport {
        match self {
            Self::Compliant { report, .. } | Self::NeedsReview { report, .. } => report,
        }
    }
}

/// A measured candidate document.
struct Candidate {
    bytes: Vec<u8>,
    quality: f32,
    scale: f32,
    width: u32,
    height: u32,
    escalated: bool,
}

pub struct DocumentEncoder {
    paper_size: PaperSize,
    margins: Margins,
    gate: DisclosureGate,
    overcompression_fraction: f64,
    /// Embed the image at its own pixel size; no coarse-scale ladder.
    pin_scale: bool,
}

impl DocumentEncoder {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            paper_size: config.paper_size,
            margins: Margins {
                standard_pt: config.standard_margin_pt,
                compact_pt: config.compact_margin_pt,
            },
            gate: DisclosureGate::new(config.review),
            overcompression_fraction: config.overcompression_fraction,
            pin_scale: false,
        }
    }

    /// Keep the embedded image at full resolution, for documents whose pixel
    /// size is mandated.
    pub fn with_pinned_scale(mut self) -> Self {
        self.pin_scale = true;
        self
    }

    /// Encode `image` as a one-page PDF fitting `request.goal`.
    ///
    /// Fails with `CompressionExhausted` when no candidate fits the ceiling.
    #[instrument(skip(self, image, request), fields(
        name = request.display_name,
        target = request.goal.target_bytes,
        ceiling = request.goal.ceiling_bytes,
    ))]
    pub fn encode(&self, image: &DynamicImage, request: DocumentRequest<'_>) -> Result<DocumentOutcome> {
        let goal = request.goal;
        let profile = margin_profile(request.layout_hint, image.width(), image.height());
        let mut writer = PdfWriter::new(self.paper_size);
        writer.set_title(title_from_name(request.display_name));
        let placement = place_image(
            writer.page_dimensions(),
            self.margins.for_profile(profile),
            (image.width(), image.height()),
        );
        let grayscale = is_grayscale(image);
        info!(?profile, scale = placement.scale, grayscale, "Laying out document page");

        let mut trial = TrialEncoder::new(image, MediaType::Jpeg);
        let mut attempts = Vec::new();
        let mut fallback: Option<Candidate> = None;

        let mut measure = |scale: f32, quality: f32, escalated: bool, attempts: &mut Vec<Attempt>| -> Result<Candidate> {
            let jpeg = trial.encode(scale, quality)?;
            let bytes = writer.create_from_jpeg(
                JpegImage {
                    data: &jpeg.bytes,
                    width: jpeg.width,
                    height: jpeg.height,
                    grayscale,
                },
                &placement,
            )?;
            attempts.push(Attempt {
                phase: if escalated { SearchPhase::Ladder } else { SearchPhase::Decay },
                quality,
                scale,
                size_bytes: bytes.len() as u64,
            });
            debug!(quality, scale, size = bytes.len(), "Document attempt");
            Ok(Candidate {
                bytes,
                quality,
                scale,
                width: jpeg.width,
                height: jpeg.height,
                escalated,
            })
        };

        // -- Quality sweep at full resolution ---------------------------------

        let mut accepted = None;
        for quality in QUALITY_SWEEP {
            let candidate = measure(1.0, quality, false, &mut attempts)?;
            let size = candidate.bytes.len() as u64;
            if size <= goal.target_bytes {
                accepted = Some(candidate);
                break;
            }
            if size <= goal.ceiling_bytes && fallback.is_none() {
                fallback = Some(candidate);
            }
        }

        // -- Coarse-scale ladder ----------------------------------------------

        if accepted.is_none() && fallback.is_none() && !self.pin_scale {
            info!("Full-resolution sweep missed the ceiling, escalating to scale ladder");
            'ladder: for scale in LADDER_SCALES {
                for quality in LADDER_QUALITIES {
                    let candidate = measure(scale, quality, true, &mut attempts)?;
                    let size = candidate.bytes.len() as u64;
                    if size <= goal.target_bytes {
                        accepted = Some(candidate);
                        break 'ladder;
                    }
                    if size <= goal.ceiling_bytes && fallback.is_none() {
                        fallback = Some(candidate);
                    }
                }
            }
        }

        let used_fallback = accepted.is_none() && fallback.is_some();
        let Some(chosen) = accepted.or(fallback) else {
            let ratio = request.current_size as f64 / goal.ceiling_bytes.max(1) as f64;
            warn!(
                current_size = request.current_size,
                ceiling = goal.ceiling_bytes,
                attempts = attempts.len(),
                "Document encode exhausted"
            );
            return Err(DocfitError::CompressionExhausted {
                original_bytes: request.current_size,
                target_bytes: goal.target_bytes,
                ceiling_bytes: goal.ceiling_bytes,
                ratio,
            });
        };

        let report = self.report(&chosen, profile, goal, used_fallback, attempts);
        info!(
            size = chosen.bytes.len(),
            quality = chosen.quality,
            scale = chosen.scale,
            used_fallback,
            landing = report.landing.describe(),
            "Document accepted"
        );

        let artifact = Artifact::new(chosen.bytes, MediaType::Pdf, request.display_name);
        match self.gate.disclose(
            artifact,
            report.quality_percent(),
            goal.ceiling_bytes,
            report.scale,
        ) {
            GateVerdict::Review(disclosure) => Ok(DocumentOutcome::NeedsReview { disclosure, report }),
            GateVerdict::Clear(artifact) => Ok(DocumentOutcome::Compliant { artifact, report }),
        }
    }

    fn report(
        &self,
        chosen: &Candidate,
        profile: MarginProfile,
        goal: SizeGoal,
        used_fallback: bool,
        attempts: Vec<Attempt>,
    ) -> DocumentReport {
        let landing = Landing::classify(chosen.bytes.len() as u64, goal, self.overcompression_fraction);
        // Landing far under the target after stepping down means the last
        // step gave away more quality than needed.
        let stepped = attempts.len() > 1;
        DocumentReport {
            quality: chosen.quality,
            scale: chosen.scale,
            width: chosen.width,
            height: chosen.height,
            margin_profile: match profile {
                MarginProfile::Standard => "standard",
                MarginProfile::Compact => "compact",
            },
            landing,
            escalated: chosen.escalated,
            used_fallback,
            overcompressed: chosen.escalated || (stepped && landing == Landing::Undershot),
            attempts,
        }
    }

    /// Page placement the encoder would use for an image of this size.
    pub fn placement_for(&self, layout_hint: &str, width: u32, height: u32) -> Placement {
        let profile = margin_profile(layout_hint, width, height);
        place_image(
            self.paper_size.dimensions_pt(),
            self.margins.for_profile(profile),
            (width, height),
        )
    }
}

/// Human title for the document info dictionary: the file stem.
fn title_from_name(display_name: &str) -> &str {
    display_name
        .rsplit_once('.')
        .map(|(stem, _)| stem)
        .filter(|stem| !stem.is_empty())
        .unwrap_or(display_name)
}
