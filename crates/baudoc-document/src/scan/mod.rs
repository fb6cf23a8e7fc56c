// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scanning pipeline — edge extraction, contour selection, quadrilateral
// validation, perspective rectification, and per-image orchestration.

pub mod contour;
pub mod edges;
pub mod pipeline;
pub mod quad;
pub mod rectify;

pub use pipeline::{DocumentScanner, ProcessedImage, ScanResult};
