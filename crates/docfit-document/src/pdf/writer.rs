// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — builds minimal single-image PDF documents byte by byte.
//
// Objects are collected first and serialised in two passes: pass one renders
// every object section and measures it, pass two concatenates the sections
// and commits a cross-reference table whose offsets are the running sum of
// the measured lengths. No offset is ever tracked by hand while writing.

use docfit_core::PaperSize;
use docfit_core::error::{DocfitError, Result};
use tracing::{debug, instrument};

use super::layout::Placement;

/// Binary comment after the header line so transfer tools treat the file
/// as binary.
const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Name of the image XObject in the page resources.
pub const IMAGE_RESOURCE: &str = "Im1";

/// Reference to an indirect object (generation is always 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectRef(u32);

impl ObjectRef {
    pub fn id(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} 0 R", self.0)
    }
}

/// Collects object bodies and serialises them with an exact xref table.
#[derive(Debug)]
pub struct PdfBuilder {
    version: &'static str,
    /// Object bodies, indexed by `id - 1`. `None` marks a reserved slot.
    objects: Vec<Option<Vec<u8>>>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            version: "1.4",
            objects: Vec::new(),
        }
    }

    /// Allocate an object number to be filled in later with [`Self::set`],
    /// so objects can reference each other before both exist.
    pub fn reserve(&mut self) -> ObjectRef {
        self.objects.push(None);
        ObjectRef(self.objects.len() as u32)
    }

    pub fn set(&mut self, object: ObjectRef, body: Vec<u8>) {
        let index = object.0 as usize - 1;
        self.objects[index] = Some(body);
    }

    /// Add a non-stream object (dictionary, array, ...).
    pub fn add(&mut self, body: impl Into<Vec<u8>>) -> ObjectRef {
        let object = self.reserve();
        self.set(object, body.into());
        object
    }

    /// Add a stream object. `entries` are extra dictionary entries; `/Length`
    /// is filled in from `data`.
    pub fn add_stream(&mut self, entries: &str, data: &[u8]) -> ObjectRef {
        let object = self.reserve();
        self.set(object, stream_body(entries, data));
        object
    }

    pub fn set_stream(&mut self, object: ObjectRef, entries: &str, data: &[u8]) {
        self.set(object, stream_body(entries, data));
    }

    /// Serialise the document with `root` as the catalog.
    pub fn finish(self, root: ObjectRef, info: Option<ObjectRef>) -> Result<Vec<u8>> {
        // Pass one: render and measure every section.
        let mut header = format!("%PDF-{}\n", self.version).into_bytes();
        header.extend_from_slice(BINARY_MARKER);

        let mut sections: Vec<Vec<u8>> = Vec::with_capacity(self.objects.len());
        for (index, body) in self.objects.into_iter().enumerate() {
            let body = body.ok_or_else(|| {
                DocfitError::PdfError(format!("object {} was reserved but never written", index + 1))
            })?;
            let mut section = format!("{} 0 obj\n", index + 1).into_bytes();
            section.extend_from_slice(&body);
            section.extend_from_slice(b"\nendobj\n");
            sections.push(section);
        }

        let mut offsets = Vec::with_capacity(sections.len());
        let mut cursor = header.len();
        for section in &sections {
            offsets.push(cursor);
            cursor += section.len();
        }
        let xref_offset = cursor;

        // Pass two: commit sections, then the table built from the offsets.
        let count = sections.len() + 1;
        let mut output = Vec::with_capacity(xref_offset + 20 * count + 128);
        output.extend_from_slice(&header);
        for section in sections {
            output.extend_from_slice(&section);
        }
        debug_assert_eq!(output.len(), xref_offset);

        output.extend_from_slice(format!("xref\n0 {count}\n").as_bytes());
        output.extend_from_slice(b"0000000000 65535 f \n");
        for offset in &offsets {
            output.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
        }

        let mut trailer = format!("trailer\n<< /Size {count} /Root {root}");
        if let Some(info) = info {
            trailer.push_str(&format!(" /Info {info}"));
        }
        trailer.push_str(&format!(" >>\nstartxref\n{xref_offset}\n%%EOF\n"));
        output.extend_from_slice(trailer.as_bytes());

        Ok(output)
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn stream_body(entries: &str, data: &[u8]) -> Vec<u8> {
    let mut body = if entries.is_empty() {
        format!("<< /Length {} >>\nstream\n", data.len()).into_bytes()
    } else {
        format!("<< {} /Length {} >>\nstream\n", entries, data.len()).into_bytes()
    };
    body.extend_from_slice(data);
    body.extend_from_slice(b"\nendstream");
    body
}

/// An encoded JPEG ready to be embedded unchanged.
#[derive(Debug, Clone, Copy)]
pub struct JpegImage<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    pub grayscale: bool,
}

/// Creates single-page PDF documents around one JPEG image.
pub struct PdfWriter {
    /// Paper size for page creation.
    paper_size: PaperSize,
    /// Title metadata embedded in the /Info dictionary.
    title: Option<String>,
}

impl PdfWriter {
    pub fn new(paper_size: PaperSize) -> Self {
        Self {
            paper_size,
            title: None,
        }
    }

    /// Create a new writer defaulting to A4.
    pub fn a4() -> Self {
        Self::new(PaperSize::A4)
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = Some(title.into());
    }

    pub fn paper_size(&self) -> PaperSize {
        self.paper_size
    }

    /// Page size in points.
    pub fn page_dimensions(&self) -> (f32, f32) {
        self.paper_size.dimensions_pt()
    }

    /// Build a one-page PDF drawing `image` at `placement`.
    ///
    /// The JPEG bytes are stored as-is behind a DCTDecode filter; nothing is
    /// re-encoded.
    #[instrument(skip(self, image), fields(jpeg_len = image.data.len(), width = image.width, height = image.height))]
    pub fn create_from_jpeg(&self, image: JpegImage<'_>, placement: &Placement) -> Result<Vec<u8>> {
        if image.width == 0 || image.height == 0 {
            return Err(DocfitError::PdfError("cannot embed an empty image".into()));
        }
        let (page_w, page_h) = self.page_dimensions();
        let mut builder = PdfBuilder::new();

        let catalog = builder.reserve();
        let pages = builder.reserve();
        let page = builder.reserve();
        let xobject = builder.reserve();
        let contents = builder.reserve();

        builder.set(catalog, format!("<< /Type /Catalog /Pages {pages} >>").into_bytes());
        builder.set(
            pages,
            format!("<< /Type /Pages /Kids [{page}] /Count 1 >>").into_bytes(),
        );
        builder.set(
            page,
            format!(
                "<< /Type /Page /Parent {pages} /MediaBox [0 0 {page_w:.2} {page_h:.2}] \
                 /Resources << /XObject << /{IMAGE_RESOURCE} {xobject} >> /ProcSet [/PDF {procset}] >> \
                 /Contents {contents} >>",
                procset = if image.grayscale { "/ImageB" } else { "/ImageC" },
            )
            .into_bytes(),
        );
        builder.set_stream(
            xobject,
            &format!(
                "/Type /XObject /Subtype /Image /Width {} /Height {} /ColorSpace {} \
                 /BitsPerComponent 8 /Filter /DCTDecode",
                image.width,
                image.height,
                if image.grayscale { "/DeviceGray" } else { "/DeviceRGB" },
            ),
            image.data,
        );
        builder.set_stream(contents, "", draw_image_program(placement).as_bytes());

        let title = self.title.as_deref().unwrap_or("Docfit Document");
        let info = builder.add(
            format!(
                "<< /Title ({}) /Producer (docfit) >>",
                escape_pdf_string(title)
            )
            .into_bytes(),
        );

        let output = builder.finish(catalog, Some(info))?;
        debug!(output_bytes = output.len(), "Document serialised");
        Ok(output)
    }
}

/// Content stream that maps the unit square onto the placement rectangle and
/// paints the image there.
fn draw_image_program(placement: &Placement) -> String {
    format!(
        "q\n{:.2} 0 0 {:.2} {:.2} {:.2} cm\n/{} Do\nQ",
        placement.width, placement.height, placement.x, placement.y, IMAGE_RESOURCE
    )
}

/// Escape a literal string; characters outside printable ASCII become `?`.
fn escape_pdf_string(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' | '(' | ')' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' '..='~' => escaped.push(ch),
            _ => escaped.push('?'),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::layout::place_image;
    use crate::pdf::reader::{PdfReader, verify_cross_reference};

    #[test]
    fn builder_offsets_point_at_objects() {
        let mut builder = PdfBuilder::new();
        let catalog = builder.reserve();
        let pages = builder.add(b"<< /Type /Pages /Kids [] /Count 0 >>".to_vec());
        builder.set(catalog, format!("<< /Type /Catalog /Pages {pages} >>").into_bytes());
        let bytes = builder.finish(catalog, None).unwrap();

        let summary = verify_cross_reference(&bytes).unwrap();
        assert_eq!(summary.objects, 2);
        assert!(bytes.starts_with(b"%PDF-1.4\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
    }

    #[test]
    fn unwritten_reservation_is_an_error() {
        let mut builder = PdfBuilder::new();
        let catalog = builder.reserve();
        let _dangling = builder.reserve();
        builder.set(catalog, b"<< /Type /Catalog >>".to_vec());
        assert!(matches!(builder.finish(catalog, None), Err(DocfitError::PdfError(_))));
    }

    #[test]
    fn stream_length_matches_data() {
        let body = stream_body("/Filter /DCTDecode", b"abcdef");
        let text = String::from_utf8(body).unwrap();
        assert!(text.starts_with("<< /Filter /DCTDecode /Length 6 >>\nstream\nabcdef\nendstream"));
    }

    #[test]
    fn image_document_is_valid_and_parseable() {
        let image = crate::test_support::gradient_image(120, 80);
        let jpeg = crate::image::encode_raster(&image, docfit_core::MediaType::Jpeg, 0.8).unwrap();
        let mut writer = PdfWriter::a4();
        writer.set_title("Photo (front)");
        let placement = place_image(writer.page_dimensions(), 36.0, (120, 80));
        let bytes = writer
            .create_from_jpeg(
                JpegImage {
                    data: &jpeg,
                    width: 120,
                    height: 80,
                    grayscale: false,
                },
                &placement,
            )
            .unwrap();

        let summary = verify_cross_reference(&bytes).unwrap();
        assert_eq!(summary.objects, 6);

        let reader = PdfReader::from_bytes(&bytes).unwrap();
        assert_eq!(reader.page_count(), 1);
        assert_eq!(reader.image_count(), 1);

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("/Title (Photo \\(front\\))"));
        assert!(text.contains("/DeviceRGB"));
        assert!(text.contains("/Im1 Do"));
    }

    #[test]
    fn grayscale_uses_device_gray() {
        let writer = PdfWriter::a4();
        let placement = place_image(writer.page_dimensions(), 36.0, (2, 2));
        let fake = [0xFF, 0xD8, 0xFF, 0xD9];
        let bytes = writer
            .create_from_jpeg(
                JpegImage {
                    data: &fake,
                    width: 2,
                    height: 2,
                    grayscale: true,
                },
                &placement,
            )
            .unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("/ColorSpace /DeviceGray"));
    }

    #[test]
    fn escape_handles_specials() {
        assert_eq!(escape_pdf_string(r"a(b)c\d"), r"a\(b\)c\\d");
        assert_eq!(escape_pdf_string("Ünïcode"), "?n?code");
    }
}
