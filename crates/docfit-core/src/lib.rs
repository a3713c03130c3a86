// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Docfit — core types, requirements, and error definitions shared across all crates.

pub mod config;
pub mod error;
pub mod format;
pub mod human_errors;
pub mod outcome;
pub mod record;
pub mod types;

pub use config::{PipelineConfig, ReviewThresholds};
pub use error::DocfitError;
pub use format::normalize_format;
pub use outcome::{QualityDisclosure, ReviewTier, TransformFailure, TransformOutcome};
pub use record::TransformationRecord;
pub use types::*;
