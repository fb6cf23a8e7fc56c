// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contour extraction and measurement — outer border following on an edge
// map, shoelace area, arc length, and closed Douglas-Peucker simplification.

use baudoc_core::ScanFailureReason;
use imageproc::contours::{BorderType, find_contours};
use imageproc::point::Point;
use tracing::debug;

use super::edges::EdgeMap;

/// A closed boundary in image coordinates, in tracing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Contour {
    points: Vec<Point<i32>>,
}

impl Contour {
    pub fn new(points: Vec<Point<i32>>) -> Self {
        Self { points }
    }

    /// Build a contour from `(x, y)` pairs.
    pub fn from_coords(coords: &[(i32, i32)]) -> Self {
        Self::new(coords.iter().map(|&(x, y)| Point::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point<i32>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Enclosed area via the shoelace formula. Winding does not matter.
    pub fn area(&self) -> f64 {
        let n = self.points.len();
        if n < 3 {
            return 0.0;
        }
        let mut twice_area = 0i64;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[(i + 1) % n];
            twice_area += a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64;
        }
        twice_area.abs() as f64 / 2.0
    }

    /// Length of the closed curve, including the segment back to the start.
    pub fn perimeter(&self) -> f64 {
        let n = self.points.len();
        if n < 2 {
            return 0.0;
        }
        (0..n)
            .map(|i| distance(self.points[i], self.points[(i + 1) % n]))
            .sum()
    }

    /// Simplify the closed curve with Douglas-Peucker at tolerance `epsilon`.
    ///
    /// The curve is split at two mutually distant points, both halves are
    /// simplified, and the surviving vertices are returned in their original
    /// tracing order.
    pub fn approximate_polygon(&self, epsilon: f64) -> Vec<Point<i32>> {
        let points = &self.points;
        let n = points.len();
        if n < 3 {
            return points.clone();
        }

        let first_split = farthest_from(points, 0);
        let second_split = farthest_from(points, first_split);
        let (lo, hi) = if first_split < second_split {
            (first_split, second_split)
        } else {
            (second_split, first_split)
        };
        if lo == hi {
            // Every point coincides.
            return vec![points[0]];
        }

        let mut keep = vec![false; n];
        keep[lo] = true;
        keep[hi] = true;

        let forward: Vec<usize> = (lo..=hi).collect();
        let wrapped: Vec<usize> = (hi..n).chain(0..=lo).collect();
        mark_douglas_peucker(points, &forward, epsilon, &mut keep);
        mark_douglas_peucker(points, &wrapped, epsilon, &mut keep);

        points
            .iter()
            .zip(keep)
            .filter_map(|(p, kept)| kept.then_some(*p))
            .collect()
    }
}

/// Trace the edge map and return the top-level outer borders only.
///
/// Holes and anything nested inside another border are dropped.
pub fn find_outer_contours(edges: &EdgeMap) -> Vec<Contour> {
    let contours: Vec<Contour> = find_contours::<i32>(edges.as_gray())
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| Contour::new(c.points))
        .collect();
    debug!(count = contours.len(), "Outer contours traced");
    contours
}

/// Pick the contour enclosing the largest area; ties go to the earliest.
pub fn largest_contour(contours: Vec<Contour>) -> Result<Contour, ScanFailureReason> {
    let mut best: Option<(f64, Contour)> = None;
    for contour in contours {
        let area = contour.area();
        match &best {
            Some((best_area, _)) if area <= *best_area => {}
            _ => best = Some((area, contour)),
        }
    }
    best.map(|(_, contour)| contour)
        .ok_or(ScanFailureReason::NoContourFound)
}

fn distance(a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    (dx * dx + dy * dy).sqrt()
}

/// Index of the point farthest from `points[from]` (first one on ties).
fn farthest_from(points: &[Point<i32>], from: usize) -> usize {
    let origin = points[from];
    let mut best = from;
    let mut best_dist = 0.0;
    for (i, p) in points.iter().enumerate() {
        let d = distance(origin, *p);
        if d > best_dist {
            best = i;
            best_dist = d;
        }
    }
    best
}

/// Distance from `p` to the infinite line through `a` and `b`.
fn line_distance(p: Point<i32>, a: Point<i32>, b: Point<i32>) -> f64 {
    let dx = (b.x - a.x) as f64;
    let dy = (b.y - a.y) as f64;
    let len = (dx * dx + dy * dy).sqrt();
    if len == 0.0 {
        return distance(p, a);
    }
    (dy * (p.x - a.x) as f64 - dx * (p.y - a.y) as f64).abs() / len
}

/// Mark the vertices Douglas-Peucker keeps along the open `chain` of point
/// indices. Both chain endpoints are assumed kept already.
fn mark_douglas_peucker(points: &[Point<i32>], chain: &[usize], epsilon: f64, keep: &mut [bool]) {
    let mut stack = vec![(0usize, chain.len().saturating_sub(1))];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let a = points[chain[start]];
        let b = points[chain[end]];

        let mut max_dist = 0.0;
        let mut split = start;
        for k in start + 1..end {
            let d = line_distance(points[chain[k]], a, b);
            if d > max_dist {
                max_dist = d;
                split = k;
            }
        }

        if max_dist > epsilon {
            keep[chain[split]] = true;
            stack.push((start, split));
            stack.push((split, end));
        }
    }
}
