// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Docfit compliance engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{DocfitError, Result};
use crate::format::normalize_format;

/// Canonical media types an artifact can be delivered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Jpeg,
    Png,
    Webp,
    /// Single-page PDF wrapping one raster image.
    Pdf,
}

impl MediaType {
    /// MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
            Self::Pdf => "application/pdf",
        }
    }

    /// Preferred file extension (without the dot).
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
            Self::Pdf => "pdf",
        }
    }

    /// True for the paginated document encoding.
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Pdf)
    }

    /// True when the encoder honours a quality setting for pixel data.
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// The `image` crate format used to encode/decode this type, if raster.
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self {
            Self::Jpeg => Some(ImageFormat::Jpeg),
            Self::Png => Some(ImageFormat::Png),
            Self::Webp => Some(ImageFormat::WebP),
            Self::Pdf => None,
        }
    }

    /// Infer media type from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" | "jfif" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "webp" => Some(Self::Webp),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Detect the media type actually present in `bytes` from its magic
    /// number, ignoring whatever the artifact claims to be.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF-") {
            return Some(Self::Pdf);
        }
        match image::guess_format(bytes).ok()? {
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Exact pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Dimensions {
    type Err = DocfitError;

    /// Parse `600x800` (also accepts `600X800` and `600*800`).
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || DocfitError::InvalidRequirement(format!("bad dimensions {s:?}, expected WIDTHxHEIGHT"));
        let (w, h) = s
            .trim()
            .split_once(['x', 'X', '*'])
            .ok_or_else(invalid)?;
        let width = w.trim().parse::<u32>().map_err(|_| invalid())?;
        let height = h.trim().parse::<u32>().map_err(|_| invalid())?;
        Ok(Self { width, height })
    }
}

/// The compliance contract a transformed artifact must satisfy.
///
/// Resolved by an external schema-discovery subsystem and supplied per call.
/// Built once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirement {
    /// Label such as "photograph" or "signature".
    pub document_type: String,
    /// Loose format token ("jpg only", "PDF", ...). `None` keeps the source format.
    pub target_format: Option<String>,
    /// Hard size ceiling in bytes. Compliance is `size <= max_size_bytes`.
    pub max_size_bytes: u64,
    /// Exact pixel dimensions, when the portal mandates them.
    pub target_dimensions: Option<Dimensions>,
}

impl Requirement {
    pub fn new(document_type: impl Into<String>, max_size_bytes: u64) -> Self {
        Self {
            document_type: document_type.into(),
            target_format: None,
            max_size_bytes,
            target_dimensions: None,
        }
    }

    pub fn with_format(mut self, token: impl Into<String>) -> Self {
        self.target_format = Some(token.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.target_dimensions = Some(Dimensions::new(width, height));
        self
    }

    /// Reject requirements no artifact could ever satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            return Err(DocfitError::InvalidRequirement(format!(
                "max size for {:?} must be greater than zero",
                self.document_type
            )));
        }
        if let Some(dims) = self.target_dimensions {
            if dims.width == 0 || dims.height == 0 {
                return Err(DocfitError::InvalidRequirement(format!(
                    "target dimensions {dims} must be non-zero"
                )));
            }
        }
        Ok(())
    }

    /// Canonical target media type, falling back to `source` when the
    /// requirement does not name a format.
    pub fn target_media_type(&self, source: MediaType) -> MediaType {
        self.target_format
            .as_deref()
            .map(normalize_format)
            .unwrap_or(source)
    }

    /// The preferred landing size: `fraction` of the ceiling, never above it
    /// and never zero.
    pub fn target_size_bytes(&self, fraction: f64) -> u64 {
        let target = (self.max_size_bytes as f64 * fraction).floor() as u64;
        target.clamp(1, self.max_size_bytes.max(1))
    }
}

/// A binary payload plus the metadata a portal checks.
///
/// Artifacts are values: transformations build new ones rather than editing
/// an existing one in place.
#[derive(Clone, PartialEq, Eq)]
pub struct Artifact {
    bytes: Vec<u8>,
    media_type: MediaType,
    display_name: String,
    last_modified: DateTime<Utc>,
}

impl Artifact {
    /// Wrap a payload, stamping it with the current time.
    pub fn new(bytes: Vec<u8>, media_type: MediaType, display_name: impl Into<String>) -> Self {
        Self::with_timestamp(bytes, media_type, display_name, Utc::now())
    }

    pub fn with_timestamp(
        bytes: Vec<u8>,
        media_type: MediaType,
        display_name: impl Into<String>,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            bytes,
            media_type,
            display_name: display_name.into(),
            last_modified,
        }
    }

    /// Produce a new artifact from this one with a different payload, keeping
    /// the display name.
    pub fn derive(&self, bytes: Vec<u8>, media_type: MediaType) -> Self {
        Self::new(bytes, media_type, self.display_name.clone())
    }

    /// Produce a new artifact with the same payload under another name.
    pub fn renamed(self, display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            last_modified: Utc::now(),
            ..self
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Payload size. Always the payload length, so it cannot drift.
    pub fn size_bytes(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// SHA-256 of the payload as lowercase hex.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("media_type", &self.media_type)
            .field("display_name", &self.display_name)
            .field("size_bytes", &self.size_bytes())
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

/// Standard paper sizes for the document page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaperSize {
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: u32, height_mm: u32 },
}

impl PaperSize {
    /// Dimensions in millimetres (width, height).
    pub fn dimensions_mm(&self) -> (u32, u32) {
        match self {
            Self::A4 => (210, 297),
            Self::A5 => (148, 210),
            Self::Letter => (216, 279),
            Self::Legal => (216, 356),
            Self::Custom {
                width_mm,
                height_mm,
            } => (*width_mm, *height_mm),
        }
    }

    /// Dimensions in PDF points (1/72 inch), rounded to two decimals.
    pub fn dimensions_pt(&self) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        let to_pt = |mm: u32| (mm as f32 * 72.0 / 25.4 * 100.0).round() / 100.0;
        (to_pt(w), to_pt(h))
    }
}

/// Pipeline states, used to tag log lines and stage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Init,
    FormatCheck,
    Decode,
    PreCompress,
    FormatConvert,
    DimensionFit,
    Compress,
    DocumentEncode,
    FilenameNormalize,
    Validate,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::FormatCheck => "format-check",
            Self::Decode => "decode",
            Self::PreCompress => "pre-compress",
            Self::FormatConvert => "format-convert",
            Self::DimensionFit => "dimension-fit",
            Self::Compress => "compress",
            Self::DocumentEncode => "document-encode",
            Self::FilenameNormalize => "filename-normalize",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
