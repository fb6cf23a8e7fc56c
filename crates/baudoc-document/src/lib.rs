// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// baudoc-document — Document scanning for construction-site report photos.
//
// Detects the paper document in a handheld photo, corrects its perspective,
// and compresses the result to JPEG for archival. Batches of report images are
// processed in parallel and written under a destination directory.

pub mod batch;
pub mod image;
pub mod scan;

// Re-export the primary structs so callers can use `baudoc_document::DocumentScanner` etc.
pub use batch::{BatchContext, BatchProcessor, BatchReport, RandomSuffix, SuffixSource};
pub use crate::image::compress::Compressor;
pub use scan::pipeline::{DocumentScanner, ProcessedImage, ScanResult};
