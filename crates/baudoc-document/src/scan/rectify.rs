// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — solves the homography taking the detected
// document corners to an upright rectangle, then fills that rectangle by
// inverse mapping through imageproc's bilinear warp.

use baudoc_core::ScanFailureReason;
use image::{DynamicImage, ImageBuffer, Pixel};
use imageproc::geometric_transformations::{Interpolation, warp_into_with};
use imageproc::point::Point;
use tracing::{debug, instrument};

use super::quad::Quadrilateral;

/// Slack allowed when an inverse-mapped coordinate lands a hair outside the
/// source image because of floating-point error.
const EDGE_TOLERANCE: f64 = 1e-6;

/// Pivots smaller than this make the correspondence system singular.
const SINGULAR_PIVOT: f64 = 1e-10;

/// A 3×3 projective transform, row-major, normalised so that `h[2][2] == 1`
/// when built from correspondences.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    m: [[f64; 3]; 3],
}

impl Homography {
    pub fn from_matrix(m: [[f64; 3]; 3]) -> Self {
        Self { m }
    }

    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.m
    }

    /// Solve for the homography mapping each `src[i]` onto `dst[i]`.
    ///
    /// Fixes h33 = 1 and solves the remaining 8 unknowns from the 8 linear
    /// equations the four correspondences give. Returns `None` when the
    /// system is singular (three or more collinear points on either side).
    pub fn from_correspondences(src: &[Point<f64>; 4], dst: &[Point<f64>; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 9]; 8];
        for i in 0..4 {
            let (x, y) = (src[i].x, src[i].y);
            let (u, v) = (dst[i].x, dst[i].y);
            a[2 * i] = [x, y, 1.0, 0.0, 0.0, 0.0, -u * x, -u * y, u];
            a[2 * i + 1] = [0.0, 0.0, 0.0, x, y, 1.0, -v * x, -v * y, v];
        }

        let h = solve_augmented(a)?;
        Some(Self {
            m: [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], 1.0]],
        })
    }

    /// The inverse transform, or `None` if the matrix is singular.
    pub fn inverse(&self) -> Option<Self> {
        let m = &self.m;
        let cofactor = |r0: usize, r1: usize, c0: usize, c1: usize| {
            m[r0][c0] * m[r1][c1] - m[r0][c1] * m[r1][c0]
        };

        let c00 = cofactor(1, 2, 1, 2);
        let c01 = -cofactor(1, 2, 0, 2);
        let c02 = cofactor(1, 2, 0, 1);
        let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
        if det.abs() < SINGULAR_PIVOT {
            return None;
        }

        // Adjugate (transposed cofactors) over the determinant.
        let adj = [
            [c00, -cofactor(0, 2, 1, 2), cofactor(0, 1, 1, 2)],
            [c01, cofactor(0, 2, 0, 2), -cofactor(0, 1, 0, 2)],
            [c02, -cofactor(0, 2, 0, 1), cofactor(0, 1, 0, 1)],
        ];
        Some(Self {
            m: adj.map(|row| row.map(|v| v / det)),
        })
    }

    /// Map a point; `None` if it lands on the line at infinity.
    pub fn apply(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let m = &self.m;
        let w = m[2][0] * x + m[2][1] * y + m[2][2];
        if w.abs() < f64::EPSILON {
            return None;
        }
        Some((
            (m[0][0] * x + m[0][1] * y + m[0][2]) / w,
            (m[1][0] * x + m[1][1] * y + m[1][2]) / w,
        ))
    }
}

/// Gaussian elimination with partial pivoting on an 8×9 augmented matrix.
fn solve_augmented(mut a: [[f64; 9]; 8]) -> Option<[f64; 8]> {
    const N: usize = 8;
    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < SINGULAR_PIVOT {
            return None;
        }
        a.swap(col, pivot);

        for row in col + 1..N {
            let factor = a[row][col] / a[col][col];
            if factor != 0.0 {
                for k in col..=N {
                    a[row][k] -= factor * a[col][k];
                }
            }
        }
    }

    let mut x = [0.0f64; N];
    for row in (0..N).rev() {
        let tail: f64 = (row + 1..N).map(|k| a[row][k] * x[k]).sum();
        x[row] = (a[row][N] - tail) / a[row][row];
    }
    Some(x)
}

fn distance(a: Point<f64>, b: Point<f64>) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Output size for `quad`: the longer of each pair of opposite edges,
/// rounded down.
pub fn target_size(quad: &Quadrilateral) -> Result<(u32, u32), ScanFailureReason> {
    let width = distance(quad.top_left, quad.top_right)
        .max(distance(quad.bottom_left, quad.bottom_right))
        .floor();
    let height = distance(quad.top_left, quad.bottom_left)
        .max(distance(quad.top_right, quad.bottom_right))
        .floor();

    if !(width > 0.0 && height > 0.0) || width > u32::MAX as f64 || height > u32::MAX as f64 {
        return Err(ScanFailureReason::DegenerateQuadrilateral);
    }
    Ok((width as u32, height as u32))
}

/// Warp the region bounded by `quad` onto an upright rectangle.
///
/// Grayscale input stays single-channel; everything else is resampled as RGB.
#[instrument(skip(image), fields(src_w = image.width(), src_h = image.height()))]
pub fn rectify(image: &DynamicImage, quad: &Quadrilateral) -> Result<DynamicImage, ScanFailureReason> {
    let (width, height) = target_size(quad)?;
    let (max_x, max_y) = ((width - 1) as f64, (height - 1) as f64);
    let dst = [
        Point::new(0.0, 0.0),
        Point::new(max_x, 0.0),
        Point::new(max_x, max_y),
        Point::new(0.0, max_y),
    ];

    let inverse = Homography::from_correspondences(&quad.corners(), &dst)
        .and_then(|h| h.inverse())
        .ok_or(ScanFailureReason::DegenerateQuadrilateral)?;
    debug!(width, height, "Homography solved");

    let warped = match image {
        DynamicImage::ImageLuma8(gray) => {
            DynamicImage::ImageLuma8(warp_inverse(gray, &inverse, width, height))
        }
        other => DynamicImage::ImageRgb8(warp_inverse(&other.to_rgb8(), &inverse, width, height)),
    };
    Ok(warped)
}

/// Fill a `width` × `height` canvas by pulling every destination pixel back
/// through `inverse` and interpolating the source bilinearly. Misses stay
/// black.
///
/// `warp_into_with` only interpolates where all four neighbours exist, so the
/// source gets one replicated row and column; a sample exactly on the last
/// row or column then weights the padding by zero.
pub fn warp_inverse<P>(
    src: &ImageBuffer<P, Vec<u8>>,
    inverse: &Homography,
    width: u32,
    height: u32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8> + Send + Sync,
{
    let (w, h) = src.dimensions();
    let (max_x, max_y) = ((w - 1) as f64, (h - 1) as f64);
    let padded = ImageBuffer::from_fn(w + 1, h + 1, |x, y| *src.get_pixel(x.min(w - 1), y.min(h - 1)));

    let mapping = |x: f32, y: f32| match inverse.apply(x as f64, y as f64) {
        Some((sx, sy))
            if sx >= -EDGE_TOLERANCE
                && sy >= -EDGE_TOLERANCE
                && sx <= max_x + EDGE_TOLERANCE
                && sy <= max_y + EDGE_TOLERANCE =>
        {
            (sx.clamp(0.0, max_x) as f32, sy.clamp(0.0, max_y) as f32)
        }
        _ => (-1.0, -1.0),
    };

    let mut out = ImageBuffer::new(width, height);
    let black = *P::from_slice(&[0u8; 4][..P::CHANNEL_COUNT as usize]);
    warp_into_with(&padded, mapping, Interpolation::Bilinear, black, &mut out);
    out
}
