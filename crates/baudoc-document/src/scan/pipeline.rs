// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan orchestration — runs edge extraction, contour selection, validation,
// and rectification for one image, falling back to the unmodified photo on
// any detection failure, then hands the result to compression.

use baudoc_core::error::Result;
use baudoc_core::{ScanConfig, ScanFailureReason, ScanOutcome, ScanStage};
use image::DynamicImage;
use tracing::{debug, info, instrument, warn};

use super::contour::{find_outer_contours, largest_contour};
use super::edges::extract_edges;
use super::quad::{Quadrilateral, validate};
use super::rectify::rectify;
use crate::image::compress::{Compressor, decode, encode_jpeg, is_jpeg};

/// Result of the detection and rectification stages for one image.
#[derive(Debug, Clone)]
pub enum ScanResult {
    /// The document was found and flattened.
    Rectified(DynamicImage),
    /// Detection failed; carries the untouched input.
    Skipped {
        original: DynamicImage,
        reason: ScanFailureReason,
    },
}

impl ScanResult {
    pub fn outcome(&self) -> ScanOutcome {
        match self {
            Self::Rectified(_) => ScanOutcome::Rectified,
            Self::Skipped { reason, .. } => ScanOutcome::Skipped(*reason),
        }
    }

    /// The image that should be compressed, whichever branch was taken.
    pub fn into_image(self) -> DynamicImage {
        match self {
            Self::Rectified(image) => image,
            Self::Skipped { original, .. } => original,
        }
    }
}

/// Final, compressed output for one uploaded image.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// JPEG bytes ready to be written to storage.
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub outcome: ScanOutcome,
}

/// Best-effort document scanner for photographed paperwork.
///
/// Stateless apart from its configuration, so one instance can be shared by
/// any number of worker threads.
#[derive(Debug, Clone, Default)]
pub struct DocumentScanner {
    config: ScanConfig,
}

impl DocumentScanner {
    /// Build a scanner, rejecting out-of-range parameters.
    pub fn new(config: ScanConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Locate the document outline in `image`.
    pub fn detect(&self, image: &DynamicImage) -> std::result::Result<Quadrilateral, ScanFailureReason> {
        let edges = extract_edges(image, self.config.canny_low, self.config.canny_high);
        debug!(stage = %ScanStage::EdgeExtracted, edge_pixels = edges.edge_count());

        let quad = largest_contour(find_outer_contours(&edges))
            .and_then(|largest| {
                debug!(
                    stage = %ScanStage::ContoursFound,
                    points = largest.len(),
                    area = largest.area()
                );
                validate(&largest, image.width(), image.height(), &self.config)
            })
            .inspect_err(|&reason| debug!(stage = %ScanStage::detection_failed(reason)))?;

        debug!(stage = %ScanStage::Validated, corners = ?quad.corners());
        Ok(quad)
    }

    /// Detect and rectify. Never fails: detection problems come back as
    /// [`ScanResult::Skipped`] with the original image.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn scan(&self, image: DynamicImage) -> ScanResult {
        debug!(stage = %ScanStage::Start);
        let attempt = self
            .detect(&image)
            .and_then(|quad| rectify(&image, &quad));

        match attempt {
            Ok(flat) => {
                info!(
                    stage = %ScanStage::Rectified,
                    out_w = flat.width(),
                    out_h = flat.height(),
                    "Document rectified"
                );
                ScanResult::Rectified(flat)
            }
            Err(reason) => {
                warn!(stage = %ScanStage::Skipped(reason), "Scan skipped; using unmodified image");
                ScanResult::Skipped {
                    original: image,
                    reason,
                }
            }
        }
    }

    /// Full per-image pipeline: decode, normalize, scan (if `apply_scan`),
    /// compress.
    ///
    /// Only undecodable input and encoder failures are errors.
    #[instrument(skip(self, data), fields(data_len = data.len()))]
    pub fn process(&self, data: &[u8], extension_hint: &str, apply_scan: bool) -> Result<ProcessedImage> {
        let decoded = decode(data, extension_hint)?;

        // Re-encode once at the normalization quality so every upload enters
        // detection as the same kind of JPEG-sourced raster.
        let (image, baseline) = match self.config.normalize_quality {
            Some(quality) => {
                let bytes = encode_jpeg(&decoded, quality)?;
                (decode(&bytes, "jpg")?, Some(bytes))
            }
            None => (decoded, is_jpeg(data).then(|| data.to_vec())),
        };

        let (image, outcome) = if apply_scan {
            let result = self.scan(image);
            let outcome = result.outcome();
            (result.into_image(), outcome)
        } else {
            (image, ScanOutcome::Disabled)
        };

        // Rectified pixels are new; the baseline no longer describes them.
        let previous = match outcome {
            ScanOutcome::Rectified => None,
            _ => baseline.as_deref(),
        };
        let bytes = Compressor::new(self.config.output_quality).compress(&image, previous)?;
        debug!(stage = %ScanStage::Compressed, bytes = bytes.len());

        Ok(ProcessedImage {
            bytes,
            width: image.width(),
            height: image.height(),
            outcome,
        })
    }
}
