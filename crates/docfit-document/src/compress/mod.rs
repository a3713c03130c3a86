// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression module — size-constrained (quality, scale) search.

pub mod engine;
pub mod plan;

pub use engine::{
    Attempt, CompressionEngine, CompressionMode, Compressed, Encoded, Landing, SearchPhase,
    SizeGoal, TrialEncoder,
};
pub use plan::RatioBand;
