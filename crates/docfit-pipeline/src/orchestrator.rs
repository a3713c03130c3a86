// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Transformation orchestrator.
//
// Runs one artifact through the stage sequence
//
//   Init → FormatCheck → Decode → (PreCompress) → FormatConvert →
//   DimensionFit → Compress | DocumentEncode → FilenameNormalize → Validate
//
// threading a `TransformationRecord` through every stage. CPU work runs on
// the blocking pool; the record and artifacts are owned by the call, so
// independent calls share nothing.

use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};

use docfit_core::error::{DocfitError, Result};
use docfit_core::human_errors::format_size;
use docfit_core::{
    Artifact, MediaType, PipelineConfig, QualityDisclosure, Requirement, Stage, TransformFailure,
    TransformOutcome, TransformationRecord,
};
use docfit_document::compress::Landing;
use docfit_document::image::processor::{encode_raster, quality_percent, scale_image};
use docfit_document::pdf::{DocumentEncoder, DocumentOutcome, DocumentReport, DocumentRequest};
use docfit_document::{
    CompressionEngine, CompressionMode, DocumentConverter, ImageProcessor, PdfReader, SizeGoal,
};

use crate::decode::{decode_with_timeout, probe_dimensions, run_blocking};
use crate::naming::{CanonicalFilename, NameCanonicalizer};

/// How a successful run ended.
enum Finished {
    Ready(Artifact),
    Review(QualityDisclosure),
}

/// One independent call for [`Transformer::transform_batch`].
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub artifact: Artifact,
    pub requirement: Requirement,
    pub hint: Option<String>,
}

/// Per-call working state.
struct Run<'a> {
    requirement: &'a Requirement,
    hint: Option<&'a str>,
    goal: SizeGoal,
    source_type: MediaType,
    target_type: MediaType,
    original_name: String,
    /// A raster conversion failed and the source format was kept.
    conversion_fallback: bool,
}

/// Makes artifacts satisfy upload requirements.
///
/// Cheap to clone; clones share configuration and the name canonicalizer.
#[derive(Clone)]
pub struct Transformer {
    config: Arc<PipelineConfig>,
    canonicalizer: Arc<dyn NameCanonicalizer>,
}

impl Transformer {
    /// Create a transformer, rejecting invalid configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            canonicalizer: Arc::new(CanonicalFilename),
        })
    }

    /// Replace the display-name policy.
    pub fn with_canonicalizer(mut self, canonicalizer: impl NameCanonicalizer + 'static) -> Self {
        self.canonicalizer = Arc::new(canonicalizer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Transform `artifact` to satisfy `requirement`.
    ///
    /// `hint` overrides the document type when naming the result. Every
    /// outcome carries the transformation record.
    #[instrument(skip_all, fields(
        name = artifact.display_name(),
        document_type = %requirement.document_type,
        max = requirement.max_size_bytes,
    ))]
    pub async fn transform(
        &self,
        artifact: Artifact,
        requirement: &Requirement,
        hint: Option<&str>,
    ) -> TransformOutcome {
        let mut record = TransformationRecord::new(
            artifact.size_bytes(),
            requirement.target_size_bytes(self.config.target_fraction),
            requirement.max_size_bytes,
        );

        match self.run(artifact, requirement, hint, &mut record).await {
            Ok(Finished::Ready(artifact)) => {
                record.finish(artifact.size_bytes());
                info!(
                    run_id = %record.run_id,
                    output = artifact.display_name(),
                    size = artifact.size_bytes(),
                    digest = %artifact.digest(),
                    "Transformation ready"
                );
                TransformOutcome::Ready { artifact, record }
            }
            Ok(Finished::Review(disclosure)) => {
                record.finish(disclosure.achieved_size_bytes);
                info!(
                    run_id = %record.run_id,
                    tier = ?disclosure.tier,
                    quality = disclosure.quality_percent,
                    digest = %disclosure.preview.digest(),
                    "Transformation needs review"
                );
                TransformOutcome::NeedsReview { disclosure, record }
            }
            Err(err) => {
                if err.is_defect() {
                    error!(run_id = %record.run_id, error = %err, "Transformation defect");
                } else {
                    warn!(run_id = %record.run_id, error = %err, "Transformation failed");
                }
                TransformOutcome::Failed(TransformFailure { error: err, record })
            }
        }
    }

    /// Run independent transformations concurrently. Outcomes are returned
    /// in the order of `jobs`.
    pub async fn transform_batch(&self, jobs: Vec<BatchJob>) -> Vec<TransformOutcome> {
        let mut outcomes: Vec<Option<TransformOutcome>> = Vec::with_capacity(jobs.len());
        let mut fallback_records = Vec::with_capacity(jobs.len());
        let mut set = JoinSet::new();

        for (index, job) in jobs.into_iter().enumerate() {
            outcomes.push(None);
            fallback_records.push(TransformationRecord::new(
                job.artifact.size_bytes(),
                job.requirement.target_size_bytes(self.config.target_fraction),
                job.requirement.max_size_bytes,
            ));
            let transformer = self.clone();
            set.spawn(async move {
                let outcome = transformer
                    .transform(job.artifact, &job.requirement, job.hint.as_deref())
                    .await;
                (index, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(err) => error!(error = %err, "Batch task failed"),
            }
        }

        outcomes
            .into_iter()
            .zip(fallback_records)
            .map(|(outcome, record)| {
                outcome.unwrap_or_else(|| {
                    TransformOutcome::Failed(TransformFailure {
                        error: DocfitError::Task("transformation task aborted".into()),
                        record,
                    })
                })
            })
            .collect()
    }

    async fn run(
        &self,
        artifact: Artifact,
        requirement: &Requirement,
        hint: Option<&str>,
        record: &mut TransformationRecord,
    ) -> Result<Finished> {
        // -- Init -------------------------------------------------------------

        requirement.validate()?;
        let declared = artifact.media_type();
        let source_type = match MediaType::sniff(artifact.bytes()) {
            Some(sniffed) if sniffed != declared => {
                record.warn(
                    Stage::Init,
                    format!("payload is {sniffed} although declared as {declared}; using {sniffed}"),
                );
                sniffed
            }
            _ => declared,
        };
        let artifact = if source_type == declared {
            artifact
        } else {
            let name = artifact.display_name().to_string();
            let last_modified = artifact.last_modified();
            Artifact::with_timestamp(artifact.into_bytes(), source_type, name, last_modified)
        };
        let mut state = Run {
            requirement,
            hint,
            goal: SizeGoal::for_requirement(requirement, self.config.target_fraction),
            source_type,
            target_type: requirement.target_media_type(source_type),
            original_name: artifact.display_name().to_string(),
            conversion_fallback: false,
        };
        record.step(
            Stage::Init,
            format!(
                "received {:?} ({}, {}, sha256 {}); target {} under {} (aiming for {})",
                state.original_name,
                source_type,
                format_size(artifact.size_bytes()),
                short_digest(&artifact),
                state.target_type,
                format_size(state.goal.ceiling_bytes),
                format_size(state.goal.target_bytes),
            ),
        );

        // -- FormatCheck ------------------------------------------------------

        if self.is_already_compliant(&artifact, &state, record) {
            return Ok(Finished::Ready(artifact));
        }

        // -- Decode -----------------------------------------------------------

        if source_type.is_document() {
            return Err(DocfitError::UnsupportedFormat(format!(
                "{} is a PDF that does not meet the requirement; PDF inputs cannot be re-encoded, \
                 supply the original image instead",
                state.original_name
            )));
        }
        let timeout = Duration::from_secs(self.config.decode_timeout_secs);
        let image = decode_with_timeout(artifact.bytes().to_vec(), timeout).await?;
        record.step(
            Stage::Decode,
            format!("decoded {}x{} pixels", image.width(), image.height()),
        );
        let mut image = Arc::new(image);
        let mut current = artifact;

        // -- PreCompress ------------------------------------------------------

        if current.size_bytes() > self.config.precompress_floor_bytes {
            (image, current) = self.precompress(image, current, record).await;
        }

        // -- FormatConvert ----------------------------------------------------

        current = self.convert_format(&image, current, &mut state, record).await;

        // -- DimensionFit -----------------------------------------------------

        if let Some(target) = requirement.target_dimensions {
            (image, current) = self.fit_dimensions(image, current, target, &state, record).await?;
        }

        // -- Compress | DocumentEncode ----------------------------------------

        if state.target_type.is_document() {
            match self.encode_document(image, &current, &state, record).await? {
                Finished::Ready(document) => current = document,
                Finished::Review(disclosure) => {
                    record.step(
                        Stage::FilenameNormalize,
                        format!("preview named {}", disclosure.preview.display_name()),
                    );
                    self.validate(&disclosure.preview, &state, record)?;
                    return Ok(Finished::Review(disclosure));
                }
            }
        } else if current.size_bytes() > requirement.max_size_bytes {
            current = self.compress(image, current, &state, record).await?;
        }

        // -- FilenameNormalize ------------------------------------------------

        let name = self
            .canonicalizer
            .canonical_name(requirement, hint, current.media_type());
        if name != current.display_name() {
            record.step(
                Stage::FilenameNormalize,
                format!("renamed {:?} to {:?}", current.display_name(), name),
            );
            current = current.renamed(name);
        }

        // -- Validate ---------------------------------------------------------

        self.validate(&current, &state, record)?;
        Ok(Finished::Ready(current))
    }

    /// Return the input untouched when it already satisfies every constraint.
    fn is_already_compliant(
        &self,
        artifact: &Artifact,
        state: &Run<'_>,
        record: &mut TransformationRecord,
    ) -> bool {
        let mut unmet = Vec::new();
        if state.source_type != state.target_type {
            unmet.push(format!("format is {} not {}", state.source_type, state.target_type));
        }
        if artifact.size_bytes() > state.requirement.max_size_bytes {
            unmet.push(format!(
                "size {} exceeds {}",
                format_size(artifact.size_bytes()),
                format_size(state.requirement.max_size_bytes)
            ));
        }
        if let Some(target) = state.requirement.target_dimensions
            && !state.source_type.is_document()
        {
            match probe_dimensions(artifact.bytes()) {
                Some(actual) if actual == target => {}
                Some(actual) => unmet.push(format!("dimensions are {actual} not {target}")),
                None => unmet.push("dimensions unreadable".to_string()),
            }
        }

        if unmet.is_empty() {
            record.step(Stage::FormatCheck, "already compliant; returned unchanged");
            true
        } else {
            record.step(Stage::FormatCheck, format!("needs work: {}", unmet.join(", ")));
            false
        }
    }

    /// Coarse best-effort pass that brings very large inputs down toward the
    /// pre-compression floor in their own format. Never fatal.
    async fn precompress(
        &self,
        image: Arc<DynamicImage>,
        current: Artifact,
        record: &mut TransformationRecord,
    ) -> (Arc<DynamicImage>, Artifact) {
        let floor = self.config.precompress_floor_bytes;
        let media_type = current.media_type();
        let current_size = current.size_bytes();
        let engine = CompressionEngine::new(CompressionMode::BestEffort)
            .with_overcompression_fraction(self.config.overcompression_fraction);
        let worker_image = Arc::clone(&image);
        let result = run_blocking(Stage::PreCompress, move || {
            engine.compress(&worker_image, media_type, current_size, SizeGoal::new(floor, floor))
        })
        .await
        .and_then(|inner| inner);

        match result {
            Ok(compressed) if compressed.size_bytes() < current_size => {
                record.step(
                    Stage::PreCompress,
                    format!(
                        "reduced {} to {} at quality {}% scale {:.2}",
                        format_size(current_size),
                        format_size(compressed.size_bytes()),
                        compressed.quality_percent(),
                        compressed.scale
                    ),
                );
                let scale = compressed.scale;
                let artifact = current.derive(compressed.bytes, media_type);
                let image = if scale < 1.0 {
                    Arc::new(scale_image(&image, scale))
                } else {
                    image
                };
                (image, artifact)
            }
            Ok(_) => {
                record.warn(Stage::PreCompress, "pre-compression did not reduce the size; keeping the original");
                (image, current)
            }
            Err(err) => {
                record.warn(Stage::PreCompress, format!("pre-compression failed ({err}); keeping the original"));
                (image, current)
            }
        }
    }

    async fn convert_format(
        &self,
        image: &Arc<DynamicImage>,
        current: Artifact,
        state: &mut Run<'_>,
        record: &mut TransformationRecord,
    ) -> Artifact {
        let from = current.media_type();
        let to = state.target_type;
        if from == to {
            record.step(Stage::FormatConvert, format!("already {to}"));
            return current;
        }
        if to.is_document() {
            record.note_format_change(state.source_type, to);
            record.step(Stage::FormatConvert, "will embed as a single-page PDF document");
            return current;
        }

        let quality = self.config.conversion_quality;
        let worker_image = Arc::clone(image);
        let source = current.clone();
        let result = run_blocking(Stage::FormatConvert, move || {
            DocumentConverter::convert_raster(&worker_image, &source, to, quality)
        })
        .await
        .and_then(|inner| inner);

        match result {
            Ok(converted) => {
                record.note_format_change(state.source_type, to);
                record.step(
                    Stage::FormatConvert,
                    format!(
                        "converted {from} to {to} at quality {}% ({})",
                        quality_percent(quality),
                        format_size(converted.size_bytes())
                    ),
                );
                converted
            }
            Err(err) => {
                state.conversion_fallback = true;
                record.warn(
                    Stage::FormatConvert,
                    format!("could not convert {from} to {to} ({err}); keeping {from}"),
                );
                current
            }
        }
    }

    async fn fit_dimensions(
        &self,
        image: Arc<DynamicImage>,
        current: Artifact,
        target: docfit_core::Dimensions,
        state: &Run<'_>,
        record: &mut TransformationRecord,
    ) -> Result<(Arc<DynamicImage>, Artifact)> {
        let before = (image.width(), image.height());
        if before == (target.width, target.height) {
            record.step(Stage::DimensionFit, format!("already {target}"));
            return Ok((image, current));
        }

        let media_type = current.media_type();
        let quality = self.config.conversion_quality;
        let encode_raster_output = !state.target_type.is_document();
        let (resized, encoded) = run_blocking(Stage::DimensionFit, move || {
            let resized = ImageProcessor::from_dynamic(Arc::unwrap_or_clone(image))
                .fit_exact(target)
                .into_dynamic();
            let encoded = if encode_raster_output {
                Some(encode_raster(&resized, media_type, quality))
            } else {
                None
            };
            (resized, encoded)
        })
        .await?;

        let current = match encoded {
            Some(bytes) => {
                let bytes = bytes.map_err(|err| DocfitError::Stage {
                    stage: Stage::DimensionFit,
                    detail: err.to_string(),
                })?;
                let artifact = current.derive(bytes, media_type);
                let verdict = if artifact.size_bytes() <= state.requirement.max_size_bytes {
                    "within the size limit, compression not needed"
                } else {
                    "still over the size limit"
                };
                record.step(
                    Stage::DimensionFit,
                    format!(
                        "resized {}x{} to {target} and re-encoded ({}), {verdict}",
                        before.0,
                        before.1,
                        format_size(artifact.size_bytes())
                    ),
                );
                artifact
            }
            None => {
                record.step(
                    Stage::DimensionFit,
                    format!("resized {}x{} to {target}", before.0, before.1),
                );
                current
            }
        };
        Ok((Arc::new(resized), current))
    }

    async fn compress(
        &self,
        image: Arc<DynamicImage>,
        current: Artifact,
        state: &Run<'_>,
        record: &mut TransformationRecord,
    ) -> Result<Artifact> {
        let media_type = current.media_type();
        let current_size = current.size_bytes();
        let goal = state.goal;
        let mut engine = CompressionEngine::new(CompressionMode::Strict)
            .with_overcompression_fraction(self.config.overcompression_fraction);
        if state.requirement.target_dimensions.is_some() {
            engine = engine.with_pinned_scale();
        }
        let compressed = run_blocking(Stage::Compress, move || {
            engine.compress(&image, media_type, current_size, goal)
        })
        .await??;

        let (seed_quality, seed_scale) = compressed
            .attempts
            .first()
            .map(|a| (a.quality, a.scale))
            .unwrap_or_else(|| compressed.band.seed());
        record.step(
            Stage::Compress,
            format!(
                "ratio {:.1}x, {} band seeded at quality {}% scale {:.2}",
                compressed.ratio,
                compressed.band,
                quality_percent(seed_quality),
                seed_scale
            ),
        );
        record.step(
            Stage::Compress,
            format!(
                "{} after {} attempts: {} at quality {}% scale {:.2} ({}x{})",
                compressed.landing.describe(),
                compressed.attempts.len(),
                format_size(compressed.size_bytes()),
                compressed.quality_percent(),
                compressed.scale,
                compressed.width,
                compressed.height
            ),
        );
        self.note_degradation(
            Stage::Compress,
            compressed.overcompressed,
            compressed.landing,
            compressed.quality_percent(),
            record,
        );

        Ok(current.derive(compressed.bytes, media_type))
    }

    async fn encode_document(
        &self,
        image: Arc<DynamicImage>,
        current: &Artifact,
        state: &Run<'_>,
        record: &mut TransformationRecord,
    ) -> Result<Finished> {
        let display_name = self
            .canonicalizer
            .canonical_name(state.requirement, state.hint, MediaType::Pdf);
        let layout_hint = format!(
            "{} {} {}",
            state.original_name,
            state.requirement.document_type,
            state.hint.unwrap_or_default()
        );
        let current_size = current.size_bytes();
        let goal = state.goal;
        let encoder = if state.requirement.target_dimensions.is_some() {
            DocumentEncoder::new(&self.config).with_pinned_scale()
        } else {
            DocumentEncoder::new(&self.config)
        };
        let outcome = run_blocking(Stage::DocumentEncode, move || {
            encoder.encode(
                &image,
                DocumentRequest {
                    display_name: &display_name,
                    layout_hint: &layout_hint,
                    current_size,
                    goal,
                },
            )
        })
        .await??;

        self.log_document(outcome.report(), record);
        match outcome {
            DocumentOutcome::Compliant { artifact, .. } => Ok(Finished::Ready(artifact)),
            DocumentOutcome::NeedsReview { disclosure, .. } => {
                record.warn(Stage::DocumentEncode, disclosure.message.clone());
                Ok(Finished::Review(disclosure))
            }
        }
    }

    fn log_document(&self, report: &DocumentReport, record: &mut TransformationRecord) {
        record.step(
            Stage::DocumentEncode,
            format!(
                "{} margins, {} after {} attempts at quality {}% scale {:.2} ({}x{} embedded){}",
                report.margin_profile,
                report.landing.describe(),
                report.attempts.len(),
                report.quality_percent(),
                report.scale,
                report.width,
                report.height,
                if report.used_fallback {
                    ", using the first document under the ceiling"
                } else {
                    ""
                }
            ),
        );
        self.note_degradation(
            Stage::DocumentEncode,
            report.overcompressed,
            report.landing,
            report.quality_percent(),
            record,
        );
    }

    fn note_degradation(
        &self,
        stage: Stage,
        overcompressed: bool,
        landing: Landing,
        quality_percent: u8,
        record: &mut TransformationRecord,
    ) {
        if overcompressed {
            record.is_overcompressed = true;
            record.warn(
                stage,
                format!("quality was reduced more than the size limit required ({})", landing.describe()),
            );
        }
        // Documents report low quality through the disclosure instead.
        if stage == Stage::Compress && quality_percent < self.config.review.caution_percent {
            record.warn(
                stage,
                format!("saved at {quality_percent}% quality; preview it before uploading"),
            );
        }
    }

    /// Recheck the finished artifact against the requirement.
    fn validate(&self, artifact: &Artifact, state: &Run<'_>, record: &mut TransformationRecord) -> Result<()> {
        let declared = artifact.media_type();
        let sniffed = MediaType::sniff(artifact.bytes());

        if declared != state.target_type || sniffed != Some(declared) {
            let detail = format!(
                "output declared {declared}, payload {}, expected {}",
                sniffed.map(|m| m.mime_type()).unwrap_or("unrecognised"),
                state.target_type
            );
            if state.conversion_fallback {
                return Err(DocfitError::Stage {
                    stage: Stage::FormatConvert,
                    detail: format!("{detail} because format conversion failed earlier"),
                });
            }
            return Err(DocfitError::ValidationFailure(detail));
        }

        if artifact.size_bytes() > state.requirement.max_size_bytes {
            return Err(DocfitError::ValidationFailure(format!(
                "output is {} bytes, over the {} byte limit",
                artifact.size_bytes(),
                state.requirement.max_size_bytes
            )));
        }

        if declared.is_document() {
            let xref = docfit_document::pdf::verify_cross_reference(artifact.bytes())
                .map_err(|err| DocfitError::ValidationFailure(err.to_string()))?;
            let pages = PdfReader::from_bytes(artifact.bytes())
                .map_err(|err| DocfitError::ValidationFailure(err.to_string()))?
                .page_count();
            if pages != 1 {
                return Err(DocfitError::ValidationFailure(format!(
                    "document has {pages} pages, expected 1"
                )));
            }
            record.step(
                Stage::Validate,
                format!(
                    "{declared}, {} within {}, {} objects with consistent offsets, 1 page",
                    format_size(artifact.size_bytes()),
                    format_size(state.requirement.max_size_bytes),
                    xref.objects
                ),
            );
        } else {
            let mut detail = format!(
                "{declared}, {} within {}",
                format_size(artifact.size_bytes()),
                format_size(state.requirement.max_size_bytes)
            );
            if let Some(target) = state.requirement.target_dimensions {
                match probe_dimensions(artifact.bytes()) {
                    Some(actual) if actual == target => detail.push_str(&format!(", {actual} pixels")),
                    Some(actual) => {
                        return Err(DocfitError::ValidationFailure(format!(
                            "output is {actual} pixels, expected {target}"
                        )));
                    }
                    None => {
                        return Err(DocfitError::ValidationFailure(
                            "output dimensions are unreadable".into(),
                        ));
                    }
                }
            }
            record.step(Stage::Validate, detail);
        }
        Ok(())
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self {
            config: Arc::new(PipelineConfig::default()),
            canonicalizer: Arc::new(CanonicalFilename),
        }
    }
}

fn short_digest(artifact: &Artifact) -> String {
    let mut digest = artifact.digest();
    digest.truncate(12);
    digest
}
