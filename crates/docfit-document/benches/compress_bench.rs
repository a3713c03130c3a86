// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the docfit-document crate: the raster compression
// search and the document encoder on a synthetic photo-like image.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use docfit_core::{MediaType, PipelineConfig};
use docfit_document::pdf::DocumentRequest;
use docfit_document::{CompressionEngine, CompressionMode, DocumentEncoder, SizeGoal};

/// Gradient with a little deterministic grain, so JPEG sizes respond to
/// quality the way camera photos do.
fn grainy_gradient(width: u32, height: u32) -> DynamicImage {
    DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
        let grain = ((x * 7 + y * 13) % 23) as u8;
        Rgb([
            (x * 200 / width) as u8 + grain,
            (y * 200 / height) as u8 + grain,
            120 + grain,
        ])
    }))
}

fn bench_raster_compression(c: &mut Criterion) {
    let image = grainy_gradient(640, 480);
    let engine = CompressionEngine::new(CompressionMode::BestEffort);
    let goal = SizeGoal::new(17_000, 20_000);

    c.bench_function("compress jpeg 640x480 to 20KB", |b| {
        b.iter(|| {
            let result = engine.compress(black_box(&image), MediaType::Jpeg, 400_000, goal);
            black_box(result.map(|compressed| compressed.size_bytes()).ok());
        });
    });
}

fn bench_document_encode(c: &mut Criterion) {
    let image = grainy_gradient(600, 800);
    let encoder = DocumentEncoder::new(&PipelineConfig::default());
    let request = DocumentRequest {
        display_name: "marksheet.pdf",
        layout_hint: "marksheet",
        current_size: 500_000,
        goal: SizeGoal::new(87_040, 102_400),
    };

    c.bench_function("document encode 600x800 to 100KB", |b| {
        b.iter(|| {
            let outcome = encoder.encode(black_box(&image), request);
            black_box(outcome.is_ok());
        });
    });
}

criterion_group!(benches, bench_raster_compression, bench_document_encode);
criterion_main!(benches);
