// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format conversion between the supported media types.
//
// Raster to raster is a single re-encode. Raster to document goes through
// the document encoder since it is size-driven. Documents are never
// rasterised.

use image::DynamicImage;
use tracing::{debug, info};

use docfit_core::error::{DocfitError, Result};
use docfit_core::{Artifact, MediaType};

use crate::image::processor::encode_raster;

/// How to get from one media type to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionPath {
    /// Already in the requested format.
    Identity,
    /// Decode and re-encode as another raster type.
    Reencode,
    /// Embed in a PDF document.
    EncodeDocument,
    /// No conversion exists (PDF to raster).
    Unsupported,
}

pub struct DocumentConverter;

impl DocumentConverter {
    pub fn conversion_path(from: MediaType, to: MediaType) -> ConversionPath {
        match (from.is_document(), to.is_document()) {
            _ if from == to => ConversionPath::Identity,
            (false, false) => ConversionPath::Reencode,
            (false, true) => ConversionPath::EncodeDocument,
            (true, _) => ConversionPath::Unsupported,
        }
    }

    /// Re-encode a decoded raster as another raster type.
    ///
    /// `source` supplies the display name and is returned with the new
    /// payload; the name's extension is fixed later by filename
    /// normalisation.
    pub fn convert_raster(
        image: &DynamicImage,
        source: &Artifact,
        to: MediaType,
        quality: f32,
    ) -> Result<Artifact> {
        match Self::conversion_path(source.media_type(), to) {
            ConversionPath::Identity => {
                debug!(format = %to, "No conversion needed");
                Ok(source.clone())
            }
            ConversionPath::Reencode => {
                let bytes = encode_raster(image, to, quality)?;
                info!(
                    from = %source.media_type(),
                    to = %to,
                    before = source.size_bytes(),
                    after = bytes.len(),
                    "Converted raster format"
                );
                Ok(source.derive(bytes, to))
            }
            ConversionPath::EncodeDocument => Err(DocfitError::UnsupportedFormat(
                "documents are produced by the document encoder".into(),
            )),
            ConversionPath::Unsupported => Err(DocfitError::UnsupportedFormat(format!(
                "cannot convert {} to {}: documents are not rasterised",
                source.media_type(),
                to
            ))),
        }
    }
}
