// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Canonical display names for finished artifacts.

use docfit_core::{MediaType, Requirement};

/// Chooses the display name of a finished artifact.
///
/// Implementations must be deterministic: the same inputs always give the
/// same name.
pub trait NameCanonicalizer: Send + Sync {
    fn canonical_name(&self, requirement: &Requirement, hint: Option<&str>, media_type: MediaType) -> String;
}

/// Lowercase ASCII slug of the hint (or the document type) plus the media
/// type's extension, e.g. `"Passport Photo"` → `passport-photo.jpg`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalFilename;

impl NameCanonicalizer for CanonicalFilename {
    fn canonical_name(&self, requirement: &Requirement, hint: Option<&str>, media_type: MediaType) -> String {
        let base = hint
            .map(strip_known_extension)
            .map(slugify)
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| slugify(&requirement.document_type));
        let base = if base.is_empty() { "document".to_string() } else { base };
        format!("{base}.{}", media_type.extension())
    }
}

/// Drop a trailing `.jpg` / `.pdf` / ... so hints taken from file names do
/// not end up as `photo-jpg.jpg`.
fn strip_known_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, ext)) if MediaType::from_extension(ext).is_some() => stem,
        _ => name,
    }
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
