// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Baudoc.
//
// Only hard failures live here. Scan-detection problems are not errors: they
// are reported as `ScanFailureReason` values and the image is still compressed.

use thiserror::Error;

/// Top-level error type for all Baudoc operations.
#[derive(Debug, Error)]
pub enum BaudocError {
    // -- Per-image errors --
    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(String),

    #[error("invalid project id: {0:?}")]
    InvalidProjectId(String),

    // -- Configuration --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BaudocError>;
