// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge extraction — luminance conversion followed by Canny hysteresis edge
// detection.

use image::{DynamicImage, GrayImage};
use imageproc::edges::canny;
use tracing::debug;

/// Binary edge map with the same dimensions as its source image.
///
/// Pixels are either 255 (edge) or 0 (no edge).
#[derive(Debug, Clone)]
pub struct EdgeMap(GrayImage);

impl EdgeMap {
    /// Wrap a grayscale raster, thresholding any non-zero pixel to an edge.
    pub fn from_gray(mut gray: GrayImage) -> Self {
        for pixel in gray.pixels_mut() {
            if pixel.0[0] != 0 {
                pixel.0[0] = 255;
            }
        }
        Self(gray)
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Whether (x, y) is an edge pixel. Out-of-range coordinates are not.
    pub fn is_edge(&self, x: u32, y: u32) -> bool {
        x < self.width() && y < self.height() && self.0.get_pixel(x, y).0[0] != 0
    }

    /// Number of edge pixels.
    pub fn edge_count(&self) -> usize {
        self.0.pixels().filter(|p| p.0[0] != 0).count()
    }

    pub fn as_gray(&self) -> &GrayImage {
        &self.0
    }
}

/// Convert `image` to luminance and run Canny with the given hysteresis
/// thresholds (`low` continues an edge, `high` starts one).
///
/// Never fails: a featureless image simply yields an empty map.
pub fn extract_edges(image: &DynamicImage, low: f32, high: f32) -> EdgeMap {
    let gray = image.to_luma8();
    let edges = EdgeMap(canny(&gray, low, high));
    debug!(
        width = edges.width(),
        height = edges.height(),
        edge_pixels = edges.edge_count(),
        "Edge map extracted"
    );
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb, RgbImage};

    #[test]
    fn blank_image_has_no_edges() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(64, 48, Luma([200u8])));
        let edges = extract_edges(&img, 50.0, 150.0);
        assert_eq!((edges.width(), edges.height()), (64, 48));
        assert_eq!(edges.edge_count(), 0);
    }

    #[test]
    fn bright_square_produces_edges_on_its_border() {
        let mut img = RgbImage::from_pixel(100, 100, Rgb([20, 20, 20]));
        for y in 25..75 {
            for x in 25..75 {
                img.put_pixel(x, y, Rgb([235, 235, 235]));
            }
        }
        let edges = extract_edges(&DynamicImage::ImageRgb8(img), 50.0, 150.0);

        assert_eq!((edges.width(), edges.height()), (100, 100));
        assert!(edges.edge_count() > 100);
        // Interior and far background stay clean.
        assert!(!edges.is_edge(50, 50));
        assert!(!edges.is_edge(5, 5));
        // Something fires within a couple of pixels of the left border.
        assert!((22..28).any(|x| edges.is_edge(x, 50)));
    }

    #[test]
    fn from_gray_binarizes() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(1, 0, Luma([7]));
        let edges = EdgeMap::from_gray(gray);
        assert_eq!(edges.as_gray().get_pixel(1, 0).0[0], 255);
        assert_eq!(edges.edge_count(), 1);
        assert!(!edges.is_edge(5, 0));
    }
}
