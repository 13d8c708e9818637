//! Irreversible preview redaction.
//!
//! The input is decoded whatever its format, flattened to RGB, blurred and
//! re-encoded as JPEG. Anything that fails along the way is an error; callers
//! must never fall back to the unblurred bytes.

use std::{io::Cursor, time::Instant};

use {
    async_trait::async_trait,
    image::{ImageReader, codecs::jpeg::JpegEncoder, imageops},
    pixlive_common::{ResultExt, traits::Redactor},
    tracing::debug,
};

use crate::error::{Error, Result};

/// JPEG quality of redacted output (0-100).
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Blur `data` with a Gaussian of standard deviation `radius` and return JPEG
/// bytes of the same dimensions.
///
/// A radius larger than half the shorter side already averages the whole
/// image, so it is capped there.
pub fn blur_image(data: &[u8], radius: u32) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Err(Error::invalid_input("empty image"));
    }

    let started = Instant::now();
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let cap = (width.min(height) / 2).max(1);
    let sigma = radius.clamp(1, cap) as f32;
    let blurred = imageops::fast_blur(&rgb, sigma);

    let mut output = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut output, DEFAULT_JPEG_QUALITY);
    blurred.write_with_encoder(encoder)?;

    debug!(
        width,
        height,
        radius,
        sigma,
        input_len = data.len(),
        output_len = output.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "image redacted"
    );
    Ok(output)
}

/// [`Redactor`] backed by [`blur_image`], run on the blocking pool.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlurRedactor;

impl BlurRedactor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Redactor for BlurRedactor {
    async fn redact(&self, image: &[u8], strength: u32) -> pixlive_common::Result<Vec<u8>> {
        let data = image.to_vec();
        tokio::task::spawn_blocking(move || blur_image(&data, strength))
            .await
            .context("redaction task")?
            .context("redaction")
    }
}
