// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docfit-pipeline — Staged transformation of artifacts into requirement-
// compliant uploads, with a record of every step.

pub mod decode;
pub mod naming;
pub mod orchestrator;

pub use naming::{CanonicalFilename, NameCanonicalizer};
pub use orchestrator::{BatchJob, Transformer};
