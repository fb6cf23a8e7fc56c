// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the baudoc-document crate: document detection plus
// rectification, and the full decode-scan-compress path, on synthetic photos.

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use baudoc_document::DocumentScanner;

/// 400x400 dark desk with a light, slightly keystoned page on it.
fn synthetic_page() -> DynamicImage {
    let mut img = RgbImage::from_pixel(400, 400, Rgb([35, 30, 30]));
    let page = [
        Point::new(110, 40),
        Point::new(300, 50),
        Point::new(370, 360),
        Point::new(30, 345),
    ];
    draw_polygon_mut(&mut img, &page, Rgb([235, 235, 225]));
    DynamicImage::ImageRgb8(img)
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_scan(c: &mut Criterion) {
    let page = synthetic_page();
    let scanner = DocumentScanner::default();

    c.bench_function("scan (400x400 keystoned page)", |b| {
        b.iter(|| black_box(scanner.scan(black_box(page.clone()))));
    });
}

fn bench_process(c: &mut Criterion) {
    let mut png = Vec::new();
    synthetic_page()
        .write_to(&mut std::io::Cursor::new(&mut png), ImageFormat::Png)
        .expect("encode benchmark input");
    let scanner = DocumentScanner::default();

    c.bench_function("process bytes (400x400, scan + compress)", |b| {
        b.iter(|| black_box(scanner.process(black_box(&png), "png", true)));
    });
}

criterion_group!(benches, bench_scan, bench_process);
criterion_main!(benches);
