// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docfit-document — Image fitting and encoding for Docfit.
//
// Provides image decode/resample/encode, the size-constrained compression
// engine, format conversion, single-page PDF encoding with read-back
// verification, and the quality disclosure gate.

pub mod compress;
pub mod convert;
pub mod disclosure;
pub mod image;
pub mod pdf;

#[cfg(test)]
mod test_support;

// Re-export the primary structs so callers can use `docfit_document::CompressionEngine` etc.
pub use compress::{CompressionEngine, CompressionMode, Compressed, Landing, RatioBand, SizeGoal};
pub use convert::{ConversionPath, DocumentConverter};
pub use disclosure::{DisclosureGate, GateVerdict};
pub use self::image::processor::ImageProcessor;
pub use pdf::{DocumentEncoder, DocumentOutcome, DocumentRequest, PdfReader, PdfWriter};
