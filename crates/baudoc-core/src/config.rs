// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application and scan-pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{BaudocError, Result};

/// Tuning parameters for document detection and compression.
///
/// The area and epsilon ratios were tuned empirically on site photos; they are
/// defaults, not invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Canny hysteresis threshold for continuing an edge (8-bit scale).
    pub canny_low: f32,
    /// Canny hysteresis threshold for starting an edge (8-bit scale).
    pub canny_high: f32,
    /// Minimum contour area as a fraction of the full image area.
    pub min_area_ratio: f64,
    /// Douglas-Peucker epsilon as a fraction of the contour perimeter.
    pub approx_epsilon_ratio: f64,
    /// JPEG quality (1-100) of the archived output.
    pub output_quality: u8,
    /// JPEG quality of the normalization pass run before scanning, if any.
    pub normalize_quality: Option<u8>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            canny_low: 50.0,
            canny_high: 150.0,
            min_area_ratio: 0.30,
            approx_epsilon_ratio: 0.02,
            output_quality: 80,
            normalize_quality: Some(90),
        }
    }
}

impl ScanConfig {
    /// Check that every parameter is in a usable range.
    pub fn validate(&self) -> Result<()> {
        if !(self.canny_low >= 0.0 && self.canny_low <= self.canny_high) {
            return Err(BaudocError::InvalidConfig(format!(
                "canny thresholds must satisfy 0 <= low <= high (low={}, high={})",
                self.canny_low, self.canny_high
            )));
        }
        if !(0.0..=1.0).contains(&self.min_area_ratio) {
            return Err(BaudocError::InvalidConfig(format!(
                "min_area_ratio must be within 0..=1, got {}",
                self.min_area_ratio
            )));
        }
        if !(self.approx_epsilon_ratio > 0.0 && self.approx_epsilon_ratio < 1.0) {
            return Err(BaudocError::InvalidConfig(format!(
                "approx_epsilon_ratio must be within (0, 1), got {}",
                self.approx_epsilon_ratio
            )));
        }
        check_quality("output_quality", self.output_quality)?;
        if let Some(quality) = self.normalize_quality {
            check_quality("normalize_quality", quality)?;
        }
        Ok(())
    }
}

fn check_quality(name: &str, quality: u8) -> Result<()> {
    if (1..=100).contains(&quality) {
        Ok(())
    } else {
        Err(BaudocError::InvalidConfig(format!(
            "{name} must be within 1..=100, got {quality}"
        )))
    }
}

/// Settings for the report image upload path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory under which report images are written.
    pub upload_root: PathBuf,
    /// Maximum number of images processed per report; extras are ignored.
    pub max_images: usize,
    /// Whether document detection and rectification run at all.
    pub apply_scan: bool,
    /// Detection and compression parameters.
    pub scan: ScanConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_root: PathBuf::from("uploads"),
            max_images: 10,
            apply_scan: true,
            scan: ScanConfig::default(),
        }
    }
}

impl AppConfig {
    /// Defaults overlaid with `UPLOAD_ROOT`, `BAUDOC_MAX_IMAGES` and
    /// `BAUDOC_APPLY_SCAN` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`AppConfig::from_env`], reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(root) = lookup("UPLOAD_ROOT") {
            config.upload_root = PathBuf::from(root);
        }
        if let Some(raw) = lookup("BAUDOC_MAX_IMAGES") {
            config.max_images = raw.trim().parse().map_err(|_| {
                BaudocError::InvalidConfig(format!("BAUDOC_MAX_IMAGES is not a count: {raw:?}"))
            })?;
        }
        if let Some(raw) = lookup("BAUDOC_APPLY_SCAN") {
            config.apply_scan = match raw.trim() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(BaudocError::InvalidConfig(format!(
                        "BAUDOC_APPLY_SCAN must be 0/1, got {other:?}"
                    )));
                }
            };
        }

        config.scan.validate()?;
        debug!(?config, "Configuration resolved from environment");
        Ok(config)
    }

    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        if let Err(err) = config.scan.validate() {
            warn!(path = %path.as_ref().display(), %err, "Rejected config file");
            return Err(err);
        }
        Ok(config)
    }

    /// Persist the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
