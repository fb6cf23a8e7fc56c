// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language notices for report authors on site.
//
// Scan skips and dropped images are shown next to the report's photo list.
// Every message says what happened to the photo and what to try next time.

use serde::Serialize;

use crate::error::BaudocError;
use crate::types::ScanFailureReason;

/// How bad the outcome is for the report author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    /// The photo was stored, just not straightened.
    PhotoKept,
    /// The photo could not be stored at all.
    PhotoDropped,
}

/// A short notice with an actionable hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HumanNotice {
    /// One-line summary.
    pub message: String,
    /// What the author can do better on the next photo.
    pub suggestion: String,
    pub severity: Severity,
}

/// Notice for a scan that fell back to the unmodified photo.
pub fn humanize_skip(reason: ScanFailureReason) -> HumanNotice {
    let (message, suggestion) = match reason {
        ScanFailureReason::NoContourFound => (
            "No document outline found; scan skipped.",
            "Photograph the document against a plain, contrasting background.",
        ),
        ScanFailureReason::ContourTooSmall => (
            "Document outline too small; scan skipped.",
            "Move closer so the document fills most of the photo.",
        ),
        ScanFailureReason::NotFourCorners => (
            "Four document corners not detected; scan skipped.",
            "Make sure all four corners are visible and not covered.",
        ),
        ScanFailureReason::DegenerateQuadrilateral => (
            "Document corners do not form a usable page; scan skipped.",
            "Hold the camera more directly above the document.",
        ),
    };
    HumanNotice {
        message: message.into(),
        suggestion: suggestion.into(),
        severity: Severity::PhotoKept,
    }
}

/// Notice for a photo that had to be dropped from the report.
pub fn humanize_error(err: &BaudocError) -> HumanNotice {
    let (message, suggestion) = match err {
        BaudocError::Decode(_) => (
            "This file is not a readable image.".to_owned(),
            "Upload the photo as JPEG or PNG.".to_owned(),
        ),
        BaudocError::Encode(_) => (
            "The photo could not be compressed for the archive.".to_owned(),
            "Try uploading the photo again, or a smaller version of it.".to_owned(),
        ),
        BaudocError::InvalidProjectId(_) => (
            "The report these photos belong to could not be identified.".to_owned(),
            "Reopen the report and upload the photos again.".to_owned(),
        ),
        BaudocError::Io(io_err) if io_err.kind() == std::io::ErrorKind::PermissionDenied => (
            "The server may not store photos in the report folder.".to_owned(),
            "Ask an administrator to check the upload directory permissions.".to_owned(),
        ),
        BaudocError::Io(io_err) => (
            "The photo could not be saved.".to_owned(),
            format!("Try again later. ({io_err})"),
        ),
        BaudocError::InvalidConfig(_) | BaudocError::Serialization(_) => (
            "The server's scan settings are invalid.".to_owned(),
            "Ask an administrator to check the configuration.".to_owned(),
        ),
    };
    HumanNotice {
        message,
        suggestion,
        severity: Severity::PhotoDropped,
    }
}
