// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Format normalizer — maps the loose format wording found in portal
// requirements ("JPG only", "jpeg/jpg", "application/pdf", "document") to one
// canonical media type.

use tracing::debug;

use crate::types::MediaType;

/// Media type used when a token names nothing we recognise.
pub const FALLBACK_MEDIA_TYPE: MediaType = MediaType::Jpeg;

/// Resolve a free-form format token to exactly one canonical media type.
///
/// The token is split into alphanumeric words and the first recognised word
/// wins, so "jpg only" and "image/jpeg" both resolve to JPEG. Unrecognised or
/// empty tokens fall back to [`FALLBACK_MEDIA_TYPE`] instead of failing.
pub fn normalize_format(token: &str) -> MediaType {
    let lowered = token.to_ascii_lowercase();
    let resolved = lowered
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .find_map(media_type_for_word);

    match resolved {
        Some(media_type) => media_type,
        None => {
            debug!(token, fallback = %FALLBACK_MEDIA_TYPE, "unrecognised format token");
            FALLBACK_MEDIA_TYPE
        }
    }
}

fn media_type_for_word(word: &str) -> Option<MediaType> {
    match word {
        "jpg" | "jpeg" | "jpe" | "jfif" | "pjpeg" => Some(MediaType::Jpeg),
        "png" => Some(MediaType::Png),
        "webp" => Some(MediaType::Webp),
        "pdf" | "document" | "doc" => Some(MediaType::Pdf),
        _ => None,
    }
}
