// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — page layout, document writing, size-driven encoding, and
// read-back verification.

pub mod encoder;
pub mod layout;
pub mod reader;
pub mod writer;

pub use encoder::{DocumentEncoder, DocumentOutcome, DocumentReport, DocumentRequest};
pub use layout::{MarginProfile, Margins, Placement};
pub use reader::{PdfReader, XrefSummary, verify_cross_reference};
pub use writer::{JpegImage, PdfBuilder, PdfWriter};
