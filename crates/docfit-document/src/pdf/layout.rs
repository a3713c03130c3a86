// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page layout for single-image documents: margin choice and image placement.

use tracing::debug;

/// Words in a display name that suggest an ID card or certificate, where the
/// usable area matters more than whitespace.
const COMPACT_KEYWORDS: &[&str] = &[
    "id",
    "idcard",
    "card",
    "aadhaar",
    "aadhar",
    "pan",
    "passport",
    "licence",
    "license",
    "certificate",
    "cert",
    "diploma",
    "marksheet",
    "transcript",
];

/// Long-edge / short-edge ratios of an ID-1 card (85.6 × 54 mm ≈ 1.585) give
/// or take a little cropping. Excludes 3:2 (1.5) and 16:9 (1.78) camera frames.
const ID_CARD_ASPECT: std::ops::RangeInclusive<f32> = 1.55..=1.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginProfile {
    Standard,
    /// Smaller margins for ID cards and certificates.
    Compact,
}

/// Margin sizes in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub standard_pt: f32,
    pub compact_pt: f32,
}

impl Margins {
    pub fn for_profile(&self, profile: MarginProfile) -> f32 {
        match profile {
            MarginProfile::Standard => self.standard_pt,
            MarginProfile::Compact => self.compact_pt,
        }
    }
}

impl Default for Margins {
    fn default() -> Self {
        Self {
            standard_pt: 36.0,
            compact_pt: 14.0,
        }
    }
}

/// Pick margins from the display name and the image's aspect ratio.
pub fn margin_profile(display_name: &str, width: u32, height: u32) -> MarginProfile {
    let lowered = display_name.to_ascii_lowercase();
    let named_compact = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .any(|word| COMPACT_KEYWORDS.contains(&word))
        || lowered.contains("certificate")
        || lowered.contains("idcard");

    let (long, short) = (width.max(height) as f32, width.min(height).max(1) as f32);
    let card_shaped = ID_CARD_ASPECT.contains(&(long / short));

    if named_compact || card_shaped {
        debug!(display_name, named_compact, card_shaped, "Using compact margins");
        MarginProfile::Compact
    } else {
        MarginProfile::Standard
    }
}

/// Where the image lands on the page, in points from the bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Uniform scale applied to the image's natural size (1 px = 1 pt).
    pub scale: f32,
}

/// Fit an image inside the page margins with a uniform scale that never
/// enlarges it, centred on the page.
pub fn place_image(page: (f32, f32), margin: f32, image: (u32, u32)) -> Placement {
    let (page_w, page_h) = page;
    let avail_w = (page_w - 2.0 * margin).max(1.0);
    let avail_h = (page_h - 2.0 * margin).max(1.0);
    let img_w = image.0.max(1) as f32;
    let img_h = image.1.max(1) as f32;

    let scale = (avail_w / img_w).min(avail_h / img_h).min(1.0);
    let width = img_w * scale;
    let height = img_h * scale;

    Placement {
        x: (page_w - width) / 2.0,
        y: (page_h - height) / 2.0,
        width,
        height,
        scale,
    }
}
