// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decode, exact-dimension fitting, trial resampling, and
// encoding to the raster media types. Operates on in-memory images using the
// `image` crate.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, Rgb, RgbImage, Rgba};
use tracing::{debug, info, instrument};

use docfit_core::error::{DocfitError, Result};
use docfit_core::types::{Dimensions, MediaType};

/// Image processing pipeline operating on a single in-memory image.
///
/// Transformations consume `self` and return a new `ImageProcessor`, so the
/// decoded source is never modified in place.
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, WebP, ...).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| DocfitError::Decode(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            color = ?img.color(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.image.width(), self.image.height())
    }

    /// Borrow the underlying `DynamicImage`.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Consume the processor and return the underlying `DynamicImage`.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Resample the image to exactly `target`, ignoring aspect ratio.
    ///
    /// This is a direct resample, not a crop. Upscaling is allowed: portals
    /// often mandate exact pixel sizes regardless of the source resolution.
    /// Uses Lanczos3 filtering.
    #[instrument(skip(self), fields(target = %target))]
    pub fn fit_exact(self, target: Dimensions) -> Self {
        if self.dimensions() == target {
            debug!("Image already at target dimensions");
            return self;
        }
        info!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            to_w = target.width,
            to_h = target.height,
            "Fitting image to exact dimensions"
        );
        let resized = self
            .image
            .resize_exact(target.width, target.height, FilterType::Lanczos3);
        Self { image: resized }
    }

    /// A copy of the image resampled by `scale` on both axes, used for
    /// compression trials.
    pub fn scaled(&self, scale: f32) -> DynamicImage {
        scale_image(&self.image, scale)
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as `media_type` at `quality` (0.0–1.0).
    pub fn encode(&self, media_type: MediaType, quality: f32) -> Result<Vec<u8>> {
        encode_raster(&self.image, media_type, quality)
    }
}

/// Resample `image` by `scale` on both axes. A scale of 1.0 returns a clone.
pub fn scale_image(image: &DynamicImage, scale: f32) -> DynamicImage {
    let (w, h) = scaled_dimensions(image.width(), image.height(), scale);
    if w == image.width() && h == image.height() {
        return image.clone();
    }
    image.resize_exact(w, h, FilterType::CatmullRom)
}

/// Pixel size after scaling, never below 1×1.
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let apply = |v: u32| ((v as f32 * scale).round() as u32).max(1);
    (apply(width), apply(height))
}

/// Map a 0.0–1.0 quality to the 1–100 scale encoders use.
pub fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}

/// Whether the image carries only luminance.
pub fn is_grayscale(image: &DynamicImage) -> bool {
    matches!(
        image.color(),
        ColorType::L8 | ColorType::La8 | ColorType::L16 | ColorType::La16
    )
}

/// Encode a `DynamicImage` as `media_type`, returning the raw bytes.
///
/// JPEG honours `quality`; transparent pixels are flattened onto white first
/// since JPEG has no alpha channel. PNG maps `quality` to deflate effort
/// (lower quality spends more effort on smaller output). WebP is lossless.
pub fn encode_raster(image: &DynamicImage, media_type: MediaType, quality: f32) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let grayscale = is_grayscale(image);
    let has_alpha = image.color().has_alpha();

    match media_type {
        MediaType::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buffer, quality_percent(quality));
            let result = match (grayscale, has_alpha) {
                (true, false) => image.to_luma8().write_with_encoder(encoder),
                (true, true) => DynamicImage::ImageRgb8(flatten_onto_white(image))
                    .to_luma8()
                    .write_with_encoder(encoder),
                (false, true) => flatten_onto_white(image).write_with_encoder(encoder),
                (false, false) => image.to_rgb8().write_with_encoder(encoder),
            };
            result.map_err(|err| DocfitError::Encode(format!("JPEG encoding failed: {}", err)))?;
        }
        MediaType::Png => {
            let compression = if quality >= 0.5 {
                CompressionType::Default
            } else {
                CompressionType::Best
            };
            let encoder = PngEncoder::new_with_quality(&mut buffer, compression, PngFilter::Adaptive);
            let result = match (grayscale, has_alpha) {
                (true, false) => image.to_luma8().write_with_encoder(encoder),
                (true, true) => image.to_luma_alpha8().write_with_encoder(encoder),
                (false, true) => image.to_rgba8().write_with_encoder(encoder),
                (false, false) => image.to_rgb8().write_with_encoder(encoder),
            };
            result.map_err(|err| DocfitError::Encode(format!("PNG encoding failed: {}", err)))?;
        }
        MediaType::Webp => {
            let encoder = WebPEncoder::new_lossless(&mut buffer);
            let result = if has_alpha {
                image.to_rgba8().write_with_encoder(encoder)
            } else {
                image.to_rgb8().write_with_encoder(encoder)
            };
            result.map_err(|err| DocfitError::Encode(format!("WebP encoding failed: {}", err)))?;
        }
        MediaType::Pdf => {
            return Err(DocfitError::UnsupportedFormat(
                "documents are built by the document encoder, not the raster encoder".into(),
            ));
        }
    }

    Ok(buffer)
}

/// Composite the image over an opaque white background.
fn flatten_onto_white(image: &DynamicImage) -> RgbImage {
    let rgba = image.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let alpha = a as u32;
        let blend = |c: u8| ((c as u32 * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
