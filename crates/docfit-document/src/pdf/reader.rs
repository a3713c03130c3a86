// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — inspects produced documents with `lopdf` and checks the
// cross-reference table byte offsets independently of any parser recovery.

use lopdf::{Document, Object};
use tracing::{debug, instrument};

use docfit_core::error::{DocfitError, Result};

/// Read-only view of a PDF document.
pub struct PdfReader {
    /// The underlying lopdf document.
    document: Document,
}

impl PdfReader {
    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            DocfitError::PdfError(format!("failed to load PDF from memory: {}", err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");
        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Number of image XObjects anywhere in the document.
    pub fn image_count(&self) -> usize {
        self.document
            .objects
            .values()
            .filter(|object| match object {
                Object::Stream(stream) => {
                    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name == b"Image")
                }
                _ => false,
            })
            .count()
    }
}

/// Result of a successful cross-reference check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XrefSummary {
    /// In-use objects listed in the table (excluding the free head entry).
    pub objects: usize,
    /// Byte offset of the `xref` keyword.
    pub startxref: usize,
}

/// Check that `startxref` points at an `xref` table and that every in-use
/// entry points at the start of the matching `N 0 obj` header.
///
/// Only single-section tables with generation 0 are accepted, which is all
/// the writer produces.
pub fn verify_cross_reference(bytes: &[u8]) -> Result<XrefSummary> {
    let startxref = read_startxref(bytes)?;
    let table = bytes
        .get(startxref..)
        .filter(|rest| rest.starts_with(b"xref\n"))
        .ok_or_else(|| invalid(format!("startxref {startxref} does not point at an xref table")))?;

    let mut lines = table.split(|&b| b == b'\n');
    lines.next(); // "xref"
    let subsection = lines
        .next()
        .and_then(|line| std::str::from_utf8(line).ok())
        .ok_or_else(|| invalid("missing xref subsection header".into()))?;
    let count = match subsection.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["0", count] => count
            .parse::<usize>()
            .map_err(|_| invalid(format!("bad xref entry count '{count}'")))?,
        _ => return Err(invalid(format!("unexpected xref subsection '{subsection}'"))),
    };
    if count == 0 {
        return Err(invalid("xref table is empty".into()));
    }

    for (object_id, line) in lines.take(count).enumerate() {
        let entry = std::str::from_utf8(line)
            .map_err(|_| invalid(format!("xref entry {object_id} is not text")))?;
        let fields: Vec<&str> = entry.split_whitespace().collect();
        match (object_id, fields.as_slice()) {
            (0, [_, "65535", "f"]) => {}
            (0, _) => return Err(invalid(format!("bad free-list head '{entry}'"))),
            (_, [offset, "00000", "n"]) => {
                let offset: usize = offset
                    .parse()
                    .map_err(|_| invalid(format!("bad offset in xref entry {object_id}")))?;
                let header = format!("{object_id} 0 obj");
                let points_at_header = bytes
                    .get(offset..)
                    .is_some_and(|rest| rest.starts_with(header.as_bytes()));
                if !points_at_header {
                    return Err(invalid(format!(
                        "xref entry {object_id} offset {offset} does not start '{header}'"
                    )));
                }
            }
            _ => return Err(invalid(format!("unsupported xref entry '{entry}'"))),
        }
    }

    Ok(XrefSummary {
        objects: count - 1,
        startxref,
    })
}

fn read_startxref(bytes: &[u8]) -> Result<usize> {
    let tail_start = bytes.len().saturating_sub(64);
    let tail = String::from_utf8_lossy(&bytes[tail_start..]);
    let after = tail
        .rfind("startxref")
        .map(|pos| &tail[pos + "startxref".len()..])
        .ok_or_else(|| invalid("missing startxref".into()))?;
    let value = after
        .split_whitespace()
        .next()
        .ok_or_else(|| invalid("startxref has no offset".into()))?;
    value
        .parse()
        .map_err(|_| invalid(format!("bad startxref offset '{value}'")))
}

fn invalid(detail: String) -> DocfitError {
    DocfitError::PdfError(format!("invalid cross-reference table: {detail}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::writer::PdfBuilder;

    fn two_object_pdf() -> Vec<u8> {
        let mut builder = PdfBuilder::new();
        let catalog = builder.reserve();
        let pages = builder.add(b"<< /Type /Pages /Kids [] /Count 0 >>".to_vec());
        builder.set(catalog, format!("<< /Type /Catalog /Pages {pages} >>").into_bytes());
        builder.finish(catalog, None).unwrap()
    }

    #[test]
    fn accepts_well_formed_table() {
        let bytes = two_object_pdf();
        let summary = verify_cross_reference(&bytes).unwrap();
        assert_eq!(summary.objects, 2);
        assert!(bytes[summary.startxref..].starts_with(b"xref"));
    }

    #[test]
    fn detects_shifted_offsets() {
        let mut bytes = two_object_pdf();
        // An extra byte after the header moves every object but not the table.
        bytes.insert(9, b'\n');
        assert!(verify_cross_reference(&bytes).is_err());
    }

    #[test]
    fn rejects_missing_trailer() {
        assert!(verify_cross_reference(b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n").is_err());
        assert!(verify_cross_reference(b"").is_err());
    }

    #[test]
    fn reader_rejects_garbage() {
        assert!(matches!(
            PdfReader::from_bytes(b"definitely not a pdf"),
            Err(DocfitError::PdfError(_))
        ));
    }
}
