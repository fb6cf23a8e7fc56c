// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoding and archival compression — turns uploaded bytes into pixels and
// pixels into fixed-quality JPEG suitable for storage and PDF embedding.

use baudoc_core::error::{BaudocError, Result};
use image::{DynamicImage, ImageFormat};
use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use tracing::{debug, instrument};

/// Decode uploaded bytes, sniffing the format from the content first and
/// falling back to `extension_hint` (e.g. `"jpg"`, `"tif"`).
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode(data: &[u8], extension_hint: &str) -> Result<DynamicImage> {
    let sniffed = image::load_from_memory(data);
    let image = match (sniffed, ImageFormat::from_extension(extension_hint)) {
        (Ok(image), _) => image,
        (Err(_), Some(format)) => image::load_from_memory_with_format(data, format)
            .map_err(|err| BaudocError::Decode(format!("{extension_hint}: {err}")))?,
        (Err(err), None) => return Err(BaudocError::Decode(err.to_string())),
    };
    if image.width() == 0 || image.height() == 0 {
        return Err(BaudocError::Decode("image has no pixels".into()));
    }
    debug!(
        width = image.width(),
        height = image.height(),
        color = ?image.color(),
        "Image decoded"
    );
    Ok(image)
}

/// Encode as baseline JPEG at `quality` (1-100), with 4:2:0 chroma
/// subsampling and optimized Huffman tables.
///
/// The image is flattened to 8-bit RGB first: alpha is dropped, grayscale is
/// expanded to three channels. Identical input and quality give identical
/// bytes.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let (Ok(w), Ok(h)) = (u16::try_from(width), u16::try_from(height)) else {
        return Err(BaudocError::Encode(format!(
            "{width}x{height} exceeds the JPEG limit of 65535 pixels per side"
        )));
    };

    let mut buffer = Vec::new();
    let mut encoder = Encoder::new(&mut buffer, quality);
    encoder.set_sampling_factor(SamplingFactor::R_4_2_0);
    encoder.set_optimized_huffman_tables(true);
    encoder
        .encode(rgb.as_raw(), w, h, ColorType::Rgb)
        .map_err(|err| BaudocError::Encode(format!("JPEG encoding failed: {err}")))?;
    Ok(buffer)
}

/// Whether `data` starts with a JPEG SOI marker.
pub fn is_jpeg(data: &[u8]) -> bool {
    data.starts_with(&[0xFF, 0xD8, 0xFF])
}

/// Fixed-quality JPEG compressor for archived report images.
#[derive(Debug, Clone, Copy)]
pub struct Compressor {
    quality: u8,
}

impl Compressor {
    pub fn new(quality: u8) -> Self {
        Self { quality }
    }

    /// Encode `image` at the configured quality.
    ///
    /// `previous` is an existing JPEG encoding of exactly these pixels, if
    /// any. Re-encoding never produces a larger file than it: when the new
    /// bytes would be bigger, the previous bytes are returned unchanged.
    #[instrument(skip_all, fields(quality = self.quality))]
    pub fn compress(&self, image: &DynamicImage, previous: Option<&[u8]>) -> Result<Vec<u8>> {
        let encoded = encode_jpeg(image, self.quality)?;
        match previous {
            Some(previous) if is_jpeg(previous) && previous.len() <= encoded.len() => {
                debug!(
                    previous = previous.len(),
                    reencoded = encoded.len(),
                    "Keeping existing JPEG; re-encode was not smaller"
                );
                Ok(previous.to_vec())
            }
            _ => {
                debug!(bytes = encoded.len(), "Compressed");
                Ok(encoded)
            }
        }
    }
}
