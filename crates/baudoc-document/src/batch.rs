// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report image batches — caps the upload count, runs the scan pipeline on a
// worker pool, writes each result under a collision-free name, and reports
// per image whether rectification was applied.

use std::io::Write;
use std::path::{Path, PathBuf};

use baudoc_core::error::{BaudocError, Result};
use baudoc_core::human_errors::{HumanNotice, humanize_error, humanize_skip};
use baudoc_core::{AppConfig, ScanFailureReason, Upload};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::scan::pipeline::{DocumentScanner, ProcessedImage};

/// Source of the random part of output filenames.
pub trait SuffixSource: Send + Sync {
    /// A short, filename-safe token. Successive calls should differ.
    fn suffix(&self) -> String;
}

/// Six lowercase hex characters from a fresh v4 UUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn suffix(&self) -> String {
        let mut hex = uuid::Uuid::new_v4().simple().to_string();
        hex.truncate(6);
        hex
    }
}

/// Per-call inputs that would otherwise be process-wide state.
pub struct BatchContext {
    /// Timestamp stamped on every filename of the batch.
    pub timestamp: DateTime<Utc>,
    /// Random filename suffixes.
    pub suffixes: Box<dyn SuffixSource>,
}

impl BatchContext {
    /// Current UTC time and UUID-based suffixes.
    pub fn new() -> Self {
        Self::with(Utc::now(), RandomSuffix)
    }

    pub fn with(timestamp: DateTime<Utc>, suffixes: impl SuffixSource + 'static) -> Self {
        Self {
            timestamp,
            suffixes: Box::new(suffixes),
        }
    }

    /// `{timestamp}_img{index}_{suffix}_processed.jpg`
    pub fn file_name(&self, index: usize) -> String {
        format!(
            "{}_img{}_{}_processed.jpg",
            self.timestamp.format("%Y-%m-%d_%H%M%S"),
            index,
            self.suffixes.suffix()
        )
    }
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}

/// One stored image.
#[derive(Debug, Clone, Serialize)]
pub struct ImageOutput {
    /// Position of the upload in submission order.
    pub index: usize,
    pub filename: String,
    pub path: PathBuf,
    pub rectified: bool,
    pub skip_reason: Option<ScanFailureReason>,
    pub notice: Option<HumanNotice>,
    pub width: u32,
    pub height: u32,
    pub bytes: usize,
}

/// An upload that could not be turned into a stored image.
#[derive(Debug, Clone, Serialize)]
pub struct DroppedImage {
    pub index: usize,
    pub filename: String,
    pub error: String,
    pub notice: HumanNotice,
}

/// Outcome of a whole batch, ordered by upload index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub outputs: Vec<ImageOutput>,
    pub dropped: Vec<DroppedImage>,
    /// Indices of uploads without a filename or without content.
    pub skipped_empty: Vec<usize>,
}

impl BatchReport {
    /// Stored paths in submission order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.outputs.iter().map(|o| o.path.clone()).collect()
    }

    pub fn rectified_count(&self) -> usize {
        self.outputs.iter().filter(|o| o.rectified).count()
    }
}

/// Processes the images attached to one report.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    scanner: DocumentScanner,
    max_images: usize,
    apply_scan: bool,
    upload_root: PathBuf,
}

impl BatchProcessor {
    pub fn new(
        scanner: DocumentScanner,
        max_images: usize,
        apply_scan: bool,
        upload_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            scanner,
            max_images,
            apply_scan,
            upload_root: upload_root.into(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            DocumentScanner::new(config.scan.clone())?,
            config.max_images,
            config.apply_scan,
            &config.upload_root,
        ))
    }

    /// Directory holding the images of one project: `{upload_root}/{project_id}`.
    ///
    /// Ids are restricted to ASCII alphanumerics, `-` and `_` so they cannot
    /// escape the upload root.
    pub fn project_dir(&self, project_id: &str) -> Result<PathBuf> {
        let valid = !project_id.is_empty()
            && project_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(BaudocError::InvalidProjectId(project_id.to_owned()));
        }
        Ok(self.upload_root.join(project_id))
    }

    /// [`BatchProcessor::process`] into the project's directory under the
    /// upload root.
    pub fn process_project(
        &self,
        uploads: &[Upload],
        project_id: &str,
        ctx: &BatchContext,
    ) -> Result<BatchReport> {
        let dest_dir = self.project_dir(project_id)?;
        self.process(uploads, &dest_dir, ctx)
    }

    /// Process up to `max_images` uploads into `dest_dir`.
    ///
    /// Uploads past the cap are ignored. A failing image is listed in
    /// [`BatchReport::dropped`] and never aborts the batch; only failing to
    /// create `dest_dir` is an error.
    #[instrument(skip(self, uploads, ctx), fields(uploads = uploads.len(), dest = %dest_dir.display()))]
    pub fn process(&self, uploads: &[Upload], dest_dir: &Path, ctx: &BatchContext) -> Result<BatchReport> {
        std::fs::create_dir_all(dest_dir)?;

        if uploads.len() > self.max_images {
            info!(
                ignored = uploads.len() - self.max_images,
                max_images = self.max_images,
                "Ignoring uploads beyond the per-report limit"
            );
        }

        let mut report = BatchReport::default();
        let mut work = Vec::new();
        for (index, upload) in uploads.iter().enumerate().take(self.max_images) {
            if upload.is_empty() {
                report.skipped_empty.push(index);
            } else {
                work.push((index, upload));
            }
        }

        let mut results: Vec<(usize, &Upload, Result<ImageOutput>)> = work
            .into_par_iter()
            .map(|(index, upload)| (index, upload, self.process_one(index, upload, dest_dir, ctx)))
            .collect();
        results.sort_by_key(|(index, _, _)| *index);

        for (index, upload, result) in results {
            match result {
                Ok(output) => report.outputs.push(output),
                Err(err) => {
                    warn!(index, filename = %upload.filename, %err, "Dropping image from batch");
                    report.dropped.push(DroppedImage {
                        index,
                        filename: upload.filename.clone(),
                        error: err.to_string(),
                        notice: humanize_error(&err),
                    });
                }
            }
        }

        info!(
            stored = report.outputs.len(),
            rectified = report.rectified_count(),
            dropped = report.dropped.len(),
            "Batch complete"
        );
        Ok(report)
    }

    fn process_one(
        &self,
        index: usize,
        upload: &Upload,
        dest_dir: &Path,
        ctx: &BatchContext,
    ) -> Result<ImageOutput> {
        let ProcessedImage {
            bytes,
            width,
            height,
            outcome,
        } = self
            .scanner
            .process(&upload.bytes, &upload.extension(), self.apply_scan)?;

        let path = dest_dir.join(ctx.file_name(index));
        write_new(&path, &bytes)?;
        info!(index, path = %path.display(), ?outcome, "Image stored");

        let skip_reason = outcome.skip_reason();
        Ok(ImageOutput {
            index,
            filename: upload.filename.clone(),
            path,
            rectified: outcome.is_rectified(),
            skip_reason,
            notice: skip_reason.map(humanize_skip),
            width,
            height,
            bytes: bytes.len(),
        })
    }
}

/// Write `data` to a file that must not exist yet.
fn write_new(path: &Path, data: &[u8]) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    file.write_all(data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic suffixes: `s00000`, `s00001`, ...
    #[derive(Default)]
    struct CountingSuffix(AtomicUsize);

    impl SuffixSource for CountingSuffix {
        fn suffix(&self) -> String {
            format!("s{:05}", self.0.fetch_add(1, Ordering::Relaxed))
        }
    }

    fn fixed_context() -> BatchContext {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        BatchContext::with(ts, CountingSuffix::default())
    }

    fn png_upload(name: &str, image: &DynamicImage) -> Upload {
        let mut bytes = Vec::new();
        image
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        Upload::new(name, bytes)
    }

    fn blank_upload(name: &str) -> Upload {
        png_upload(name, &DynamicImage::ImageLuma8(GrayImage::from_pixel(32, 24, Luma([180]))))
    }

    fn default_processor() -> BatchProcessor {
        BatchProcessor::from_config(&AppConfig::default()).unwrap()
    }

    #[test]
    fn random_suffix_is_six_hex_chars() {
        let suffix = RandomSuffix.suffix();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn file_name_layout() {
        let ctx = fixed_context();
        assert_eq!(ctx.file_name(3), "2026-03-14_092653_img3_s00000_processed.jpg");
        assert_eq!(ctx.file_name(3), "2026-03-14_092653_img3_s00001_processed.jpg");
    }

    #[test]
    fn batch_is_capped_at_max_images() {
        let dir = tempfile::tempdir().unwrap();
        let uploads: Vec<Upload> = (0..15).map(|i| blank_upload(&format!("photo{i}.png"))).collect();

        let report = default_processor()
            .process(&uploads, dir.path(), &fixed_context())
            .unwrap();

        assert_eq!(report.outputs.len(), 10);
        let indices: Vec<usize> = report.outputs.iter().map(|o| o.index).collect();
        assert_eq!(indices, (0..10).collect::<Vec<_>>());
        for output in &report.outputs {
            assert_eq!(output.filename, format!("photo{}.png", output.index));
            assert!(output.path.exists());
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 10);
    }

    #[test]
    fn skipped_scans_are_reported_per_image() {
        let dir = tempfile::tempdir().unwrap();
        let report = default_processor()
            .process(&[blank_upload("blank.png")], dir.path(), &fixed_context())
            .unwrap();

        let output = &report.outputs[0];
        assert!(!output.rectified);
        assert_eq!(output.skip_reason, Some(ScanFailureReason::NoContourFound));
        assert!(output.notice.is_some());
        assert_eq!(std::fs::read(&output.path).unwrap().len(), output.bytes);
    }

    #[test]
    fn document_photo_is_rectified() {
        let dir = tempfile::tempdir().unwrap();
        let mut photo = RgbImage::from_pixel(240, 240, Rgb([35, 30, 30]));
        for y in 40..=200 {
            for x in 30..=210 {
                photo.put_pixel(x, y, Rgb([235, 235, 225]));
            }
        }
        let uploads = [png_upload("receipt.PNG", &DynamicImage::ImageRgb8(photo))];

        let report = default_processor()
            .process(&uploads, dir.path(), &fixed_context())
            .unwrap();

        assert_eq!(report.rectified_count(), 1);
        let output = &report.outputs[0];
        assert!(output.rectified);
        assert!(output.notice.is_none());
        assert!(output.width < 240 && output.height < 240);
    }

    #[test]
    fn undecodable_upload_is_dropped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = [
            blank_upload("a.png"),
            Upload::new("broken.jpg", b"not an image".to_vec()),
            blank_upload("c.png"),
        ];

        let report = default_processor()
            .process(&uploads, dir.path(), &fixed_context())
            .unwrap();

        assert_eq!(report.outputs.len(), 2);
        assert_eq!(report.outputs[0].index, 0);
        assert_eq!(report.outputs[1].index, 2);
        assert_eq!(report.dropped.len(), 1);
        assert_eq!(report.dropped[0].index, 1);
        assert_eq!(report.dropped[0].filename, "broken.jpg");
    }

    #[test]
    fn empty_uploads_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = [
            Upload::new("", vec![1, 2, 3]),
            blank_upload("b.png"),
            Upload::new("c.jpg", Vec::new()),
        ];

        let report = default_processor()
            .process(&uploads, dir.path(), &fixed_context())
            .unwrap();

        assert_eq!(report.skipped_empty, vec![0, 2]);
        assert_eq!(report.outputs.len(), 1);
        assert_eq!(report.outputs[0].index, 1);
    }

    #[test]
    fn repeated_batches_in_the_same_second_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = fixed_context();
        let processor = default_processor();
        let uploads: Vec<Upload> = (0..3).map(|i| blank_upload(&format!("{i}.png"))).collect();

        let first = processor.process(&uploads, dir.path(), &ctx).unwrap();
        let second = processor.process(&uploads, dir.path(), &ctx).unwrap();

        assert_eq!(first.outputs.len() + second.outputs.len(), 6);
        assert!(second.dropped.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 6);
    }

    #[test]
    fn scan_can_be_switched_off() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            apply_scan: false,
            ..AppConfig::default()
        };
        let report = BatchProcessor::from_config(&config)
            .unwrap()
            .process(&[blank_upload("a.png")], dir.path(), &fixed_context())
            .unwrap();

        let output = &report.outputs[0];
        assert!(!output.rectified);
        assert_eq!(output.skip_reason, None);
        assert_eq!((output.width, output.height), (32, 24));
    }

    #[test]
    fn report_serializes_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let report = default_processor()
            .process(&[blank_upload("a.png")], dir.path(), &fixed_context())
            .unwrap();

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outputs"][0]["skip_reason"], "NoContourFound");
        assert_eq!(json["outputs"][0]["rectified"], false);
        assert_eq!(report.paths().len(), 1);
    }

    #[test]
    fn project_batches_land_under_the_upload_root() {
        let root = tempfile::tempdir().unwrap();
        let config = AppConfig {
            upload_root: root.path().to_path_buf(),
            ..AppConfig::default()
        };
        let processor = BatchProcessor::from_config(&config).unwrap();

        let report = processor
            .process_project(&[blank_upload("a.png")], "site-42_north", &fixed_context())
            .unwrap();
        let project = root.path().join("site-42_north");
        assert_eq!(report.outputs[0].path.parent(), Some(project.as_path()));
        assert!(report.outputs[0].path.exists());
    }

    #[test]
    fn project_ids_cannot_escape_the_upload_root() {
        let root = tempfile::tempdir().unwrap();
        let config = AppConfig {
            upload_root: root.path().to_path_buf(),
            ..AppConfig::default()
        };
        let processor = BatchProcessor::from_config(&config).unwrap();

        for bad in ["", "..", "../etc", "a/b", "a b"] {
            let err = processor
                .process_project(&[blank_upload("a.png")], bad, &fixed_context())
                .unwrap_err();
            assert!(matches!(err, BaudocError::InvalidProjectId(_)), "{bad:?}");
        }
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }
}
