// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Size-constrained compression engine.
//
// Drives the encoded size of a raster under a byte ceiling by searching over
// (quality, scale). The search is seeded from how far the input is from the
// ceiling, decays quality (and later scale) each attempt, then falls back to
// a fixed ladder of aggressive settings. Attempts are strictly sequential:
// each one's parameters depend on the previous measurement.

use image::DynamicImage;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use docfit_core::Requirement;
use docfit_core::error::{DocfitError, Result};
use docfit_core::types::MediaType;

use super::plan::{EARLY_WINDOW, LADDER, MIN_QUALITY, MIN_SCALE, RatioBand};
use crate::image::processor::{encode_raster, quality_percent, scale_image};

/// What to do when even the ladder cannot reach the ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMode {
    /// Fail with `CompressionExhausted`.
    Strict,
    /// Return the smallest encode produced, with a degradation warning, when
    /// nothing fits under the ceiling.
    BestEffort,
}

/// Preferred landing size and hard ceiling, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SizeGoal {
    pub target_bytes: u64,
    pub ceiling_bytes: u64,
}

impl SizeGoal {
    /// The target is clamped to the ceiling.
    pub fn new(target_bytes: u64, ceiling_bytes: u64) -> Self {
        Self {
            target_bytes: target_bytes.min(ceiling_bytes),
            ceiling_bytes,
        }
    }

    /// Aim for `fraction` of the requirement's ceiling.
    pub fn for_requirement(requirement: &Requirement, fraction: f64) -> Self {
        Self::new(
            requirement.target_size_bytes(fraction),
            requirement.max_size_bytes,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchPhase {
    Decay,
    Ladder,
}

/// One measured encode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Attempt {
    pub phase: SearchPhase,
    pub quality: f32,
    pub scale: f32,
    pub size_bytes: u64,
}

/// Where an accepted size fell relative to the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Landing {
    /// Within the preferred window below the target.
    MetTarget,
    /// Far below the target: quality was given up unnecessarily.
    Undershot,
    /// Above the target but at or under the ceiling.
    CeilingOnly,
    /// Above the ceiling (best-effort results only).
    OverCeiling,
}

impl Landing {
    pub fn classify(size_bytes: u64, goal: SizeGoal, undershoot_fraction: f64) -> Self {
        if size_bytes > goal.ceiling_bytes {
            Self::OverCeiling
        } else if size_bytes > goal.target_bytes {
            Self::CeilingOnly
        } else if (size_bytes as f64) < goal.target_bytes as f64 * undershoot_fraction {
            Self::Undershot
        } else {
            Self::MetTarget
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::MetTarget => "met the target size",
            Self::Undershot => "landed well under the target size",
            Self::CeilingOnly => "missed the target but met the hard ceiling",
            Self::OverCeiling => "exceeds the hard ceiling",
        }
    }
}

/// A single encode at fixed settings.
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub quality: f32,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

impl Encoded {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Encodes a source image at a given (scale, quality), reusing the last
/// resample while the scale stays the same.
pub struct TrialEncoder<'a> {
    source: &'a DynamicImage,
    media_type: MediaType,
    cached: Option<(f32, DynamicImage)>,
}

impl<'a> TrialEncoder<'a> {
    pub fn new(source: &'a DynamicImage, media_type: MediaType) -> Self {
        Self {
            source,
            media_type,
            cached: None,
        }
    }

    pub fn encode(&mut self, scale: f32, quality: f32) -> Result<Encoded> {
        let reuse = matches!(&self.cached, Some((cached_scale, _)) if *cached_scale == scale);
        if !reuse {
            self.cached = Some((scale, scale_image(self.source, scale)));
        }
        let Some((_, scaled)) = self.cached.as_ref() else {
            return Err(DocfitError::Encode("resample cache unexpectedly empty".into()));
        };
        let bytes = encode_raster(scaled, self.media_type, quality)?;
        Ok(Encoded {
            bytes,
            quality,
            scale,
            width: scaled.width(),
            height: scaled.height(),
        })
    }
}

/// Outcome of a successful compression run.
#[derive(Debug, Clone)]
pub struct Compressed {
    pub bytes: Vec<u8>,
    pub media_type: MediaType,
    pub quality: f32,
    pub scale: f32,
    pub width: u32,
    pub height: u32,
    /// `current_size / ceiling` at the start of the search.
    pub ratio: f64,
    pub band: RatioBand,
    pub landing: Landing,
    /// The fixed ladder produced the result.
    pub escalated: bool,
    /// Quality was sacrificed more than the goal needed.
    pub overcompressed: bool,
    pub attempts: Vec<Attempt>,
    /// Set when the result is a best-effort encode above the ceiling.
    pub warning: Option<String>,
}

impl Compressed {
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn quality_percent(&self) -> u8 {
        quality_percent(self.quality)
    }

    pub fn within_ceiling(&self) -> bool {
        self.landing != Landing::OverCeiling
    }
}

/// Iterative (quality, scale) search for an encode under a byte ceiling.
#[derive(Debug, Clone)]
pub struct CompressionEngine {
    mode: CompressionMode,
    /// Landing below `target * fraction` counts as undershooting.
    overcompression_fraction: f64,
    /// Search quality only; every encode keeps the input's pixel size.
    pin_scale: bool,
}

impl CompressionEngine {
    pub fn new(mode: CompressionMode) -> Self {
        Self {
            mode,
            overcompression_fraction: 0.5,
            pin_scale: false,
        }
    }

    pub fn with_overcompression_fraction(mut self, fraction: f64) -> Self {
        self.overcompression_fraction = fraction;
        self
    }

    /// Keep every encode at full resolution, for outputs whose pixel size is
    /// mandated. Lossless formats then cannot shrink much beyond encoder
    /// effort.
    pub fn with_pinned_scale(mut self) -> Self {
        self.pin_scale = true;
        self
    }

    pub fn mode(&self) -> CompressionMode {
        self.mode
    }

    /// Search for the highest-quality encode of `image` as `media_type` that
    /// fits `goal`.
    ///
    /// `current_size` is the size of the artifact being replaced; it decides
    /// how aggressively the search starts.
    #[instrument(skip(self, image, goal), fields(
        target = goal.target_bytes,
        ceiling = goal.ceiling_bytes,
    ))]
    pub fn compress(
        &self,
        image: &DynamicImage,
        media_type: MediaType,
        current_size: u64,
        goal: SizeGoal,
    ) -> Result<Compressed> {
        if media_type.is_document() {
            return Err(DocfitError::UnsupportedFormat(
                "the raster compression engine cannot produce documents".into(),
            ));
        }

        let ratio = current_size as f64 / goal.ceiling_bytes.max(1) as f64;
        let band = RatioBand::for_ratio(ratio);
        let (mut quality, mut scale) = band.seed();
        if self.pin_scale {
            scale = 1.0;
        }
        info!(ratio, band = %band, quality, scale, pinned = self.pin_scale, "Seeding compression search");

        let mut trial = TrialEncoder::new(image, media_type);
        let mut attempts: Vec<Attempt> = Vec::new();
        let mut smallest: Option<Encoded> = None;
        // First encode at or under the ceiling, and whether the ladder made it.
        let mut fallback: Option<(Encoded, bool)> = None;

        // -- Decay loop -------------------------------------------------------

        for index in 0..band.attempt_budget() {
            let encoded = trial.encode(scale, quality)?;
            let size = encoded.size_bytes();
            attempts.push(Attempt {
                phase: SearchPhase::Decay,
                quality,
                scale,
                size_bytes: size,
            });
            debug!(attempt = index + 1, quality, scale, size, "Compression attempt");

            if size <= goal.target_bytes {
                // Undershooting only counts against us once scale decay has
                // started; early attempts run at the seed settings.
                let decayed_scale = index >= EARLY_WINDOW;
                return Ok(self.accept(encoded, media_type, ratio, band, goal, false, decayed_scale, attempts));
            }
            keep_fallback(&mut fallback, &encoded, goal, false);
            keep_smallest(&mut smallest, encoded);

            quality = (quality * band.quality_decay()).max(MIN_QUALITY);
            if index + 1 >= EARLY_WINDOW && !self.pin_scale {
                scale = (scale * band.scale_decay()).max(MIN_SCALE);
            }
        }

        // -- Escalation ladder ------------------------------------------------

        let limit = ((goal.target_bytes as f64 * band.tolerance()).floor() as u64).min(goal.ceiling_bytes);
        info!(limit, "Decay budget exhausted, escalating to fixed ladder");

        let (mut prev_quality, mut prev_scale) = attempts
            .last()
            .map(|a| (a.quality, a.scale))
            .unwrap_or((quality, scale));

        for &(ladder_scale, step_quality) in LADDER.iter() {
            let step_scale = if self.pin_scale { 1.0 } else { ladder_scale };
            let no_smaller = if self.pin_scale {
                step_quality >= prev_quality
            } else {
                step_scale > prev_scale && step_quality > prev_quality
            };
            if no_smaller {
                debug!(step_scale, step_quality, "Skipping ladder step above previous attempt");
                continue;
            }
            let encoded = trial.encode(step_scale, step_quality)?;
            let size = encoded.size_bytes();
            attempts.push(Attempt {
                phase: SearchPhase::Ladder,
                quality: step_quality,
                scale: step_scale,
                size_bytes: size,
            });
            debug!(step_scale, step_quality, size, "Ladder attempt");
            prev_quality = step_quality;
            prev_scale = step_scale;

            if size <= limit {
                return Ok(self.accept(encoded, media_type, ratio, band, goal, true, true, attempts));
            }
            keep_fallback(&mut fallback, &encoded, goal, true);
            keep_smallest(&mut smallest, encoded);
        }

        if let Some((encoded, from_ladder)) = fallback {
            info!(
                size = encoded.size_bytes(),
                ceiling = goal.ceiling_bytes,
                "Target missed, using first encode under the ceiling"
            );
            return Ok(self.accept(encoded, media_type, ratio, band, goal, from_ladder, true, attempts));
        }

        // -- Unreachable ------------------------------------------------------

        match (self.mode, smallest) {
            (CompressionMode::BestEffort, Some(best)) => {
                let message = format!(
                    "could not reach {} bytes from {} bytes (ratio {:.1}x); returning best effort of {} bytes",
                    goal.ceiling_bytes,
                    current_size,
                    ratio,
                    best.size_bytes()
                );
                warn!("{message}");
                let mut compressed = self.accept(best, media_type, ratio, band, goal, true, true, attempts);
                compressed.warning = Some(message);
                Ok(compressed)
            }
            _ => {
                warn!(current_size, ceiling = goal.ceiling_bytes, ratio, "Compression exhausted");
                Err(DocfitError::CompressionExhausted {
                    original_bytes: current_size,
                    target_bytes: goal.target_bytes,
                    ceiling_bytes: goal.ceiling_bytes,
                    ratio,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn accept(
        &self,
        encoded: Encoded,
        media_type: MediaType,
        ratio: f64,
        band: RatioBand,
        goal: SizeGoal,
        escalated: bool,
        aggressive: bool,
        attempts: Vec<Attempt>,
    ) -> Compressed {
        let landing = Landing::classify(encoded.size_bytes(), goal, self.overcompression_fraction);
        let overcompressed = escalated || (aggressive && landing == Landing::Undershot);
        info!(
            size = encoded.size_bytes(),
            quality = encoded.quality,
            scale = encoded.scale,
            attempts = attempts.len(),
            escalated,
            landing = landing.describe(),
            "Compression accepted"
        );
        Compressed {
            bytes: encoded.bytes,
            media_type,
            quality: encoded.quality,
            scale: encoded.scale,
            width: encoded.width,
            height: encoded.height,
            ratio,
            band,
            landing,
            escalated,
            overcompressed,
            attempts,
            warning: None,
        }
    }
}

fn keep_fallback(fallback: &mut Option<(Encoded, bool)>, candidate: &Encoded, goal: SizeGoal, from_ladder: bool) {
    if fallback.is_none() && candidate.size_bytes() <= goal.ceiling_bytes {
        *fallback = Some((candidate.clone(), from_ladder));
    }
}

fn keep_smallest(smallest: &mut Option<Encoded>, candidate: Encoded) {
    let replace = smallest
        .as_ref()
        .is_none_or(|best| candidate.size_bytes() < best.size_bytes());
    if replace {
        *smallest = Some(candidate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{gradient_image, noise_image};

    fn assert_monotonic(attempts: &[Attempt]) {
        for pair in attempts.windows(2) {
            assert!(
                !(pair[1].quality > pair[0].quality && pair[1].scale > pair[0].scale),
                "both quality and scale increased: {:?} -> {:?}",
                pair[0],
                pair[1]
            );
        }
    }

    #[test]
    fn easy_goal_accepts_first_attempt() {
        let img = gradient_image(64, 64);
        let engine = CompressionEngine::new(CompressionMode::Strict);
        let goal = SizeGoal::new(850_000, 1_000_000);
        let result = engine.compress(&img, MediaType::Jpeg, 20_000, goal).unwrap();

        assert_eq!(result.attempts.len(), 1);
        assert_eq!(result.band, RatioBand::Mild);
        assert_eq!((result.quality, result.scale), (0.9, 1.0));
        assert!(!result.escalated);
        assert!(!result.overcompressed);
        assert_eq!((result.width, result.height), (64, 64));
    }

    #[test]
    fn extreme_ratio_reaches_ceiling() {
        let img = noise_image(256, 256, 3);
        let original = encode_raster(&img, MediaType::Jpeg, 0.95).unwrap();
        let current = original.len() as u64;
        let ceiling = current / 12;
        let goal = SizeGoal::new(ceiling * 85 / 100, ceiling);

        let engine = CompressionEngine::new(CompressionMode::Strict);
        let result = engine.compress(&img, MediaType::Jpeg, current, goal).unwrap();

        assert_eq!(result.band, RatioBand::Extreme);
        assert!(result.ratio > 8.0);
        assert!(result.size_bytes() <= ceiling);
        assert_eq!(result.attempts[0].quality, 0.3);
        assert_eq!(result.attempts[0].scale, 0.4);
        assert_eq!(MediaType::sniff(&result.bytes), Some(MediaType::Jpeg));
        assert_monotonic(&result.attempts);
    }

    #[test]
    fn scale_holds_during_early_window() {
        let img = noise_image(160, 160, 11);
        let original = encode_raster(&img, MediaType::Jpeg, 0.95).unwrap();
        let current = original.len() as u64;
        // Ratio just above 1: mild band, several attempts needed.
        let ceiling = current * 10 / 14;
        let goal = SizeGoal::new(ceiling / 4, ceiling);

        let engine = CompressionEngine::new(CompressionMode::BestEffort);
        let result = engine.compress(&img, MediaType::Jpeg, current, goal).unwrap();

        assert!(result.attempts.len() >= 3, "attempts: {:?}", result.attempts);
        assert_eq!(result.attempts[0].scale, result.attempts[1].scale);
        assert!(result.attempts[2].scale < result.attempts[1].scale);
        assert!(result.attempts[1].quality < result.attempts[0].quality);
        assert_monotonic(&result.attempts);
    }

    #[test]
    fn strict_mode_fails_with_sizes_in_message() {
        let img = noise_image(64, 64, 5);
        let engine = CompressionEngine::new(CompressionMode::Strict);
        let goal = SizeGoal::new(40, 50);
        let err = engine.compress(&img, MediaType::Jpeg, 9_000, goal).unwrap_err();

        match &err {
            DocfitError::CompressionExhausted {
                original_bytes,
                ceiling_bytes,
                ..
            } => {
                assert_eq!(*original_bytes, 9_000);
                assert_eq!(*ceiling_bytes, 50);
            }
            other => panic!("unexpected error: {other}"),
        }
        let message = err.to_string();
        assert!(message.contains("9000"));
        assert!(message.contains("50 bytes"));
    }

    #[test]
    fn best_effort_returns_smallest_with_warning() {
        let img = noise_image(64, 64, 5);
        let engine = CompressionEngine::new(CompressionMode::BestEffort);
        let goal = SizeGoal::new(40, 50);
        let result = engine.compress(&img, MediaType::Jpeg, 9_000, goal).unwrap();

        assert!(!result.within_ceiling());
        assert!(result.warning.is_some());
        assert!(result.escalated);
        let min_attempt = result.attempts.iter().map(|a| a.size_bytes).min().unwrap();
        assert_eq!(result.size_bytes(), min_attempt);
        assert_monotonic(&result.attempts);
    }

    #[test]
    fn decay_encode_under_ceiling_is_kept_when_target_missed() {
        let img = noise_image(256, 256, 7);
        let current = 10_000_000;

        // Record the full attempt sequence with an unreachable goal.
        let full_run = CompressionEngine::new(CompressionMode::BestEffort)
            .compress(&img, MediaType::Jpeg, current, SizeGoal::new(1, 1))
            .unwrap();
        let smallest_decay = full_run
            .attempts
            .iter()
            .filter(|a| a.phase == SearchPhase::Decay)
            .map(|a| a.size_bytes)
            .min()
            .unwrap();

        // Ceiling exactly at the smallest decay encode, target just below it.
        let ceiling = smallest_decay;
        let goal = SizeGoal::new(ceiling - 1, ceiling);
        let ladder_fits = full_run
            .attempts
            .iter()
            .any(|a| a.phase == SearchPhase::Ladder && a.size_bytes <= ceiling);

        let strict = CompressionEngine::new(CompressionMode::Strict)
            .compress(&img, MediaType::Jpeg, current, goal)
            .unwrap();
        assert!(strict.size_bytes() <= ceiling);
        assert!(strict.within_ceiling());
        if !ladder_fits {
            assert_eq!(strict.landing, Landing::CeilingOnly);
            assert_eq!(strict.size_bytes(), smallest_decay);
            assert!(!strict.escalated);
        }

        let best_effort = CompressionEngine::new(CompressionMode::BestEffort)
            .compress(&img, MediaType::Jpeg, current, goal)
            .unwrap();
        assert!(best_effort.within_ceiling());
        assert!(best_effort.warning.is_none());
        assert_eq!(best_effort.bytes, strict.bytes);
    }

    #[test]
    fn pinned_scale_keeps_pixel_size() {
        let img = noise_image(200, 150, 17);
        let original = encode_raster(&img, MediaType::Jpeg, 0.95).unwrap();
        let current = original.len() as u64;
        let ceiling = current / 10;
        let goal = SizeGoal::new(ceiling * 85 / 100, ceiling);

        let engine = CompressionEngine::new(CompressionMode::Strict).with_pinned_scale();
        let result = engine.compress(&img, MediaType::Jpeg, current, goal).unwrap();

        assert_eq!(result.band, RatioBand::Extreme);
        assert_eq!((result.width, result.height), (200, 150));
        assert!(result.size_bytes() <= ceiling);
        assert!(result.attempts.iter().all(|a| a.scale == 1.0));
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (200, 150));
        assert_monotonic(&result.attempts);
    }

    #[test]
    fn pinned_scale_lossless_fails_strictly() {
        let img = noise_image(120, 120, 19);
        let original = encode_raster(&img, MediaType::Png, 0.9).unwrap();
        let current = original.len() as u64;
        let goal = SizeGoal::new(current / 12, current / 10);

        let engine = CompressionEngine::new(CompressionMode::Strict).with_pinned_scale();
        let err = engine.compress(&img, MediaType::Png, current, goal).unwrap_err();
        assert!(matches!(err, DocfitError::CompressionExhausted { .. }));
    }

    #[test]
    fn search_is_deterministic() {
        let img = noise_image(128, 96, 21);
        let engine = CompressionEngine::new(CompressionMode::Strict);
        let goal = SizeGoal::new(6_000, 7_000);
        let first = engine.compress(&img, MediaType::Jpeg, 40_000, goal).unwrap();
        let second = engine.compress(&img, MediaType::Jpeg, 40_000, goal).unwrap();

        assert_eq!(first.bytes, second.bytes);
        assert_eq!(first.attempts, second.attempts);
    }

    #[test]
    fn png_shrinks_through_scale() {
        let img = noise_image(200, 200, 9);
        let original = encode_raster(&img, MediaType::Png, 0.9).unwrap();
        let current = original.len() as u64;
        let ceiling = current / 4;
        let goal = SizeGoal::new(ceiling * 85 / 100, ceiling);

        let engine = CompressionEngine::new(CompressionMode::Strict);
        let result = engine.compress(&img, MediaType::Png, current, goal).unwrap();

        assert!(result.size_bytes() <= ceiling);
        assert!(result.scale < 1.0);
        assert_eq!(MediaType::sniff(&result.bytes), Some(MediaType::Png));
    }

    #[test]
    fn ladder_acceptance_flags_overcompression() {
        let img = noise_image(200, 200, 13);
        let engine = CompressionEngine::new(CompressionMode::Strict);
        // Mild band with a very small ceiling forces the ladder.
        let goal = SizeGoal::new(2_500, 3_000);
        let result = engine.compress(&img, MediaType::Jpeg, 3_100, goal).unwrap();

        assert_eq!(result.band, RatioBand::Mild);
        assert!(result.escalated);
        assert!(result.overcompressed);
        assert!(result.size_bytes() <= 3_000);
        assert!(result.attempts.iter().any(|a| a.phase == SearchPhase::Ladder));
        assert_monotonic(&result.attempts);
    }

    #[test]
    fn landing_classification() {
        let goal = SizeGoal::new(850, 1000);
        assert_eq!(Landing::classify(1001, goal, 0.5), Landing::OverCeiling);
        assert_eq!(Landing::classify(900, goal, 0.5), Landing::CeilingOnly);
        assert_eq!(Landing::classify(800, goal, 0.5), Landing::MetTarget);
        assert_eq!(Landing::classify(100, goal, 0.5), Landing::Undershot);
    }

    #[test]
    fn goal_clamps_target_to_ceiling() {
        let goal = SizeGoal::new(2_000, 1_000);
        assert_eq!(goal.target_bytes, 1_000);
        let req = Requirement::new("photograph", 200 * 1024);
        let goal = SizeGoal::for_requirement(&req, 0.85);
        assert_eq!(goal.ceiling_bytes, 204_800);
        assert_eq!(goal.target_bytes, 174_080);
    }

    #[test]
    fn documents_are_rejected() {
        let img = gradient_image(8, 8);
        let engine = CompressionEngine::new(CompressionMode::Strict);
        let result = engine.compress(&img, MediaType::Pdf, 100, SizeGoal::new(10, 10));
        assert!(matches!(result, Err(DocfitError::UnsupportedFormat(_))));
    }
}
