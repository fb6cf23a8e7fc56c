// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Quadrilateral validation — decides whether the largest contour is a usable
// document outline and assigns its corners to fixed roles.

use baudoc_core::{ScanConfig, ScanFailureReason};
use imageproc::point::Point;
use tracing::debug;

use super::contour::Contour;

/// Document corners in cyclic order: top-left, top-right, bottom-right,
/// bottom-left. Rectification relies on this order to avoid mirroring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quadrilateral {
    pub top_left: Point<f64>,
    pub top_right: Point<f64>,
    pub bottom_right: Point<f64>,
    pub bottom_left: Point<f64>,
}

impl Quadrilateral {
    /// Corners as `[TL, TR, BR, BL]`.
    pub fn corners(&self) -> [Point<f64>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

/// Assign corner roles to four unordered vertices.
///
/// TL minimises x+y, BR maximises it; TR minimises y−x, BL maximises it.
/// Ties go to the vertex that comes first in `vertices`.
pub fn order_corners(vertices: &[Point<f64>; 4]) -> Quadrilateral {
    let sum = |p: &Point<f64>| p.x + p.y;
    let diff = |p: &Point<f64>| p.y - p.x;

    Quadrilateral {
        top_left: vertices[first_extreme(vertices, sum, |a, b| a < b)],
        top_right: vertices[first_extreme(vertices, diff, |a, b| a < b)],
        bottom_right: vertices[first_extreme(vertices, sum, |a, b| a > b)],
        bottom_left: vertices[first_extreme(vertices, diff, |a, b| a > b)],
    }
}

fn first_extreme(
    vertices: &[Point<f64>; 4],
    key: impl Fn(&Point<f64>) -> f64,
    better: impl Fn(f64, f64) -> bool,
) -> usize {
    let mut best = 0;
    for i in 1..vertices.len() {
        if better(key(&vertices[i]), key(&vertices[best])) {
            best = i;
        }
    }
    best
}

/// Check `contour` against the document heuristics for an image of
/// `image_width` × `image_height` pixels.
///
/// Rejects, in order: too little area, no clean four-corner simplification.
pub fn validate(
    contour: &Contour,
    image_width: u32,
    image_height: u32,
    config: &ScanConfig,
) -> Result<Quadrilateral, ScanFailureReason> {
    let area = contour.area();
    let min_area = image_width as f64 * image_height as f64 * config.min_area_ratio;
    if area < min_area {
        debug!(area, min_area, "Contour below area threshold");
        return Err(ScanFailureReason::ContourTooSmall);
    }

    let epsilon = config.approx_epsilon_ratio * contour.perimeter();
    let polygon = contour.approximate_polygon(epsilon);
    debug!(vertices = polygon.len(), epsilon, "Contour simplified");

    let vertices: [Point<f64>; 4] = match polygon.as_slice() {
        [a, b, c, d] => [a, b, c, d].map(|p| Point::new(p.x as f64, p.y as f64)),
        _ => return Err(ScanFailureReason::NotFourCorners),
    };

    Ok(order_corners(&vertices))
}
