//! Resizing helpers for resolution loss and pixelation.
//!
//! Upsampling and nearest-neighbour sampling go through
//! `image::imageops::resize`. The area-average downscale has no equivalent
//! filter there, so it is done here over `(height, width, channel)` arrays
//! with fractional pixel coverage.

use image::imageops::{self, FilterType};
use ndarray::Array3;

use crate::error::Result;
use crate::frame::Frame;
use crate::image_size::ImageSize;

/// `(source index, weight)` taps for one destination sample.
type Taps = Vec<(usize, f64)>;

fn area_taps(src: usize, dst: usize) -> Vec<Taps> {
    let scale = src as f64 / dst as f64;
    (0..dst)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src);
            let mut taps: Taps = (first..last)
                .filter_map(|s| {
                    let lo = (s as f64).max(start);
                    let hi = ((s + 1) as f64).min(end);
                    let coverage = hi - lo;
                    (coverage > 0.0).then_some((s, coverage))
                })
                .collect();
            let total: f64 = taps.iter().map(|(_, w)| w).sum();
            if total > 0.0 {
                taps.iter_mut().for_each(|(_, w)| *w /= total);
            } else {
                taps = vec![(first.min(src - 1), 1.0)];
            }
            taps
        })
        .collect()
}

/// Box-filter resize with fractional coverage weights, rows then columns.
pub fn resize_area(input: &Array3<f64>, size: ImageSize) -> Array3<f64> {
    let (height, width, channels) = input.dim();
    if size.is_empty() || height == 0 || width == 0 {
        return Array3::zeros((size.height, size.width, channels));
    }
    if size.height == height && size.width == width {
        return input.clone();
    }
    let row_taps = area_taps(height, size.height);
    let col_taps = area_taps(width, size.width);

    let horizontal = Array3::from_shape_fn((height, size.width, channels), |(y, x, c)| {
        col_taps[x]
            .iter()
            .map(|&(sx, w)| input[[y, sx, c]] * w)
            .sum::<f64>()
    });
    Array3::from_shape_fn((size.height, size.width, channels), |(y, x, c)| {
        row_taps[y]
            .iter()
            .map(|&(sy, w)| horizontal[[sy, x, c]] * w)
            .sum()
    })
}

fn resize_with(frame: &Frame, size: ImageSize, filter: FilterType) -> Result<Frame> {
    if frame.size() == size {
        return Ok(frame.clone());
    }
    let resized = imageops::resize(
        &frame.to_rgb_image(),
        size.width as u32,
        size.height as u32,
        filter,
    );
    Frame::from_rgb_image(&resized)
}

/// Bilinear resize with half-pixel centers and clamped edges.
pub fn resize_bilinear(frame: &Frame, size: ImageSize) -> Result<Frame> {
    resize_with(frame, size, FilterType::Triangle)
}

/// Nearest-neighbour resize.
pub fn resize_nearest(frame: &Frame, size: ImageSize) -> Result<Frame> {
    resize_with(frame, size, FilterType::Nearest)
}
