// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blocking work off the async runtime: decode with a hard deadline, and the
// CPU-heavy encode stages.

use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageReader};
use tracing::{debug, instrument, warn};

use docfit_core::error::{DocfitError, Result};
use docfit_core::{Dimensions, Stage};
use docfit_document::ImageProcessor;

/// Run `work` on the blocking pool and wait for it.
pub async fn run_blocking<T, F>(stage: Stage, work: F) -> Result<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| DocfitError::Task(format!("{stage} worker failed: {err}")))
}

/// Run `work` on the blocking pool, giving up after `limit`.
///
/// A blocking task cannot be interrupted; on timeout it runs to completion in
/// the background and its result is dropped.
pub async fn run_with_deadline<T, F>(limit: Duration, work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(limit, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(err)) => Err(DocfitError::Task(format!("decode worker failed: {err}"))),
        Err(_) => {
            warn!(limit_secs = limit.as_secs_f32(), "Blocking work exceeded its deadline");
            Err(DocfitError::DecodeTimeout {
                seconds: limit.as_secs(),
            })
        }
    }
}

/// Decode a raster payload on the blocking pool with a hard timeout.
#[instrument(skip(bytes), fields(bytes_len = bytes.len()))]
pub async fn decode_with_timeout(bytes: Vec<u8>, limit: Duration) -> Result<DynamicImage> {
    let image = run_with_deadline(limit, move || {
        ImageProcessor::from_bytes(&bytes).map(ImageProcessor::into_dynamic)
    })
    .await?;
    debug!(width = image.width(), height = image.height(), "Decoded");
    Ok(image)
}

/// Pixel size from the image header without decoding pixel data.
pub fn probe_dimensions(bytes: &[u8]) -> Option<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .ok()?
        .into_dimensions()
        .ok()?;
    Some(Dimensions::new(width, height))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut out = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(width, height))
            .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[tokio::test]
    async fn decodes_valid_payload() {
        let image = decode_with_timeout(png_bytes(12, 7), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!((image.width(), image.height()), (12, 7));
    }

    #[tokio::test]
    async fn garbage_is_a_decode_error() {
        let err = decode_with_timeout(b"not an image".to_vec(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, DocfitError::Decode(_)));
    }

    #[tokio::test]
    async fn slow_work_times_out() {
        let err = run_with_deadline(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
            Ok(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, DocfitError::DecodeTimeout { seconds: 0 }));
    }

    #[tokio::test]
    async fn blocking_returns_value() {
        let value = run_blocking(Stage::Compress, || 41 + 1).await.unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn probes_header_dimensions() {
        assert_eq!(probe_dimensions(&png_bytes(30, 40)), Some(Dimensions::new(30, 40)));
        assert_eq!(probe_dimensions(b"%PDF-1.4"), None);
    }
}
