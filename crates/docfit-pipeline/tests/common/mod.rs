// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared fixtures for pipeline integration tests.

#![allow(dead_code)]

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use docfit_core::{Artifact, MediaType};

pub fn gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            160,
        ])
    }))
}

pub fn noise(width: u32, height: u32, seed: u64) -> DynamicImage {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |_, _| {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let bytes = (state >> 24).to_le_bytes();
        Rgb([bytes[0], bytes[1], bytes[2]])
    }))
}

pub fn png_artifact(image: &DynamicImage, name: &str) -> Artifact {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    Artifact::new(bytes, MediaType::Png, name)
}

pub fn jpeg_artifact(image: &DynamicImage, quality: u8, name: &str) -> Artifact {
    let mut bytes = Vec::new();
    image
        .to_rgb8()
        .write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .unwrap();
    Artifact::new(bytes, MediaType::Jpeg, name)
}
