// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Baudoc scan pipeline.

use serde::{Deserialize, Serialize};

use crate::human_errors::{HumanNotice, humanize_skip};

/// Why document detection did not rectify an image.
///
/// These are soft outcomes: the image is still compressed and stored, just
/// without perspective correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScanFailureReason {
    /// The edge map produced no closed outline at all.
    NoContourFound,
    /// The largest outline covers too little of the photo to be the document.
    ContourTooSmall,
    /// The largest outline does not simplify to exactly four corners.
    NotFourCorners,
    /// Four corners were found but they span no area (e.g. collinear).
    DegenerateQuadrilateral,
}

impl ScanFailureReason {
    /// Stable machine-readable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoContourFound => "no_contour_found",
            Self::ContourTooSmall => "contour_too_small",
            Self::NotFourCorners => "not_four_corners",
            Self::DegenerateQuadrilateral => "degenerate_quadrilateral",
        }
    }

    /// Plain-language notice for the report author.
    pub fn notice(&self) -> HumanNotice {
        humanize_skip(*self)
    }
}

impl std::fmt::Display for ScanFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the scan stage did to one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScanOutcome {
    /// The document was detected and perspective-corrected.
    Rectified,
    /// Detection failed; the unmodified image was used.
    Skipped(ScanFailureReason),
    /// Scanning was switched off for this batch.
    Disabled,
}

impl ScanOutcome {
    pub fn is_rectified(&self) -> bool {
        matches!(self, Self::Rectified)
    }

    pub fn skip_reason(&self) -> Option<ScanFailureReason> {
        match self {
            Self::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Stages an image passes through on its way to compression.
///
/// `Start → EdgeExtracted → ContoursFound | NoContours →
/// Validated | Rejected → Rectified | Skipped → Compressed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Start,
    EdgeExtracted,
    ContoursFound,
    NoContours,
    Validated,
    Rejected(ScanFailureReason),
    Rectified,
    Skipped(ScanFailureReason),
    Compressed,
}

impl ScanStage {
    /// The stage at which detection stopped for `reason`.
    pub fn detection_failed(reason: ScanFailureReason) -> Self {
        match reason {
            ScanFailureReason::NoContourFound => Self::NoContours,
            other => Self::Rejected(other),
        }
    }
}

impl std::fmt::Display for ScanStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => f.write_str("start"),
            Self::EdgeExtracted => f.write_str("edge_extracted"),
            Self::ContoursFound => f.write_str("contours_found"),
            Self::NoContours => f.write_str("no_contours"),
            Self::Validated => f.write_str("validated"),
            Self::Rejected(reason) => write!(f, "rejected({reason})"),
            Self::Rectified => f.write_str("rectified"),
            Self::Skipped(reason) => write!(f, "skipped({reason})"),
            Self::Compressed => f.write_str("compressed"),
        }
    }
}

/// One uploaded file as handed over by the upload layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    /// Client-side filename; only used to derive an extension.
    pub filename: String,
    /// Raw, still encoded file contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }

    /// True when there is nothing to process (no name or no content).
    pub fn is_empty(&self) -> bool {
        self.filename.trim().is_empty() || self.bytes.is_empty()
    }

    /// Lowercase extension of the sanitized filename, `"jpg"` if none.
    pub fn extension(&self) -> String {
        sanitize_extension(&self.filename)
    }
}

/// Extract a filesystem-safe, lowercase extension from an untrusted filename.
///
/// Path components are stripped and only ASCII alphanumerics survive.
pub fn sanitize_extension(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let ext: String = base
        .rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext)
        .unwrap_or_default()
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ext.is_empty() { "jpg".to_owned() } else { ext }
}
