//! Deterministic photometric and sampling degradations.
//!
//! Each degradation comes in two halves: a factor function that maps a level
//! fraction `f = level / max_level` onto the concrete parameter, and an apply
//! function that consumes that parameter. Keeping them apart lets the
//! gradient sequencer drive the apply functions with values that did not
//! come from a level.
//!
//! All apply functions are pure and clamp their output to the code range.

use serde::{Deserialize, Serialize};

use crate::color::hsv::{hsv8_to_rgb, rgb_to_hsv8};
use crate::error::Result;
use crate::frame::Frame;
use crate::image_size::ImageSize;
use crate::level::LevelScale;
use crate::resample::{resize_area, resize_bilinear, resize_nearest};

/// Smallest side length kept by [`reduce_resolution`].
pub const MIN_RESOLUTION_SIDE: usize = 8;

/// Default pixelation block scale: block sizes run from 1 to `K + 1`.
pub const DEFAULT_PIXELATION_BLOCK_SCALE: u32 = 20;

/// Brightness multiplier for a level.
///
/// The lower half of the scale darkens from 1.0 down to 0.2, the upper half
/// brightens from 1.0 up to 2.5.
pub fn brightness_factor(level: u32, scale: &LevelScale) -> Result<f64> {
    let level = scale.check(level)? as f64;
    let half = scale.max_level() as f64 / 2.0;
    if level <= half {
        Ok(1.0 - (level / half) * 0.8)
    } else {
        Ok(1.0 + ((level - half) / half) * 1.5)
    }
}

/// Contrast multiplier, from 1.0 at `f = 0` down to 0.01 at `f = 1`.
pub fn contrast_factor(fraction: f64) -> f64 {
    1.0 - fraction * 0.99
}

/// Hue offset in half-degree units, from -180 to +180.
pub fn hue_shift(fraction: f64) -> f64 {
    fraction * 360.0 - 180.0
}

/// Saturation multiplier, from 0.1 to 3.0.
pub fn saturation_factor(fraction: f64) -> f64 {
    0.1 + fraction * 2.9
}

/// Side scale for resolution loss, from 1.0 to 0.05.
pub fn resolution_scale(fraction: f64) -> f64 {
    1.0 - fraction * 0.95
}

/// Pixel block edge for pixelation, from 1 to `block_scale + 1`.
pub fn pixelation_block_size(fraction: f64, block_scale: u32) -> u32 {
    ((fraction * block_scale as f64).floor() as u32 + 1).max(1)
}

/// Gaussian blur sigma; zero at `f = 0`, then from 0.1 up to 20.
pub fn blur_sigma(fraction: f64) -> f64 {
    if fraction <= 0.0 {
        0.0
    } else {
        0.1 + fraction * 19.9
    }
}

/// Direction of a color cast, selected by `level mod 6`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelBias {
    Redward,
    Greenward,
    Blueward,
    Yellowward,
    Cyanward,
    Magentaward,
}

impl ChannelBias {
    pub const ALL: [ChannelBias; 6] = [
        ChannelBias::Redward,
        ChannelBias::Greenward,
        ChannelBias::Blueward,
        ChannelBias::Yellowward,
        ChannelBias::Cyanward,
        ChannelBias::Magentaward,
    ];

    pub fn from_level(level: u32) -> Self {
        Self::ALL[(level % 6) as usize]
    }

    /// Per-channel `[r, g, b]` multipliers at the given intensity.
    pub fn multipliers(&self, intensity: f64) -> [f64; 3] {
        let boost = 1.0 + intensity;
        let cut = 1.0 - intensity * 0.3;
        let remove = 1.0 - intensity * 0.5;
        match self {
            ChannelBias::Redward => [boost, cut, 1.0],
            ChannelBias::Greenward => [cut, boost, 1.0],
            ChannelBias::Blueward => [1.0, cut, boost],
            ChannelBias::Yellowward => [1.0, 1.0, remove],
            ChannelBias::Cyanward => [remove, 1.0, 1.0],
            ChannelBias::Magentaward => [1.0, remove, 1.0],
        }
    }
}

/// Multiply every channel by `factor`.
pub fn adjust_brightness(frame: &Frame, factor: f64) -> Frame {
    Frame::quantize(&frame.to_f64().mapv(|v| v * factor))
}

/// Scale distances from the global mean (over all channels) by `factor`.
pub fn adjust_contrast(frame: &Frame, factor: f64) -> Frame {
    let mean = frame.mean_value();
    Frame::quantize(&frame.to_f64().mapv(|v| (v - mean) * factor + mean))
}

/// Rotate hue and scale saturation in packed 8-bit HSV.
///
/// Hue wraps modulo 180 and saturation clamps to `[0, 255]`; both are
/// truncated back to bytes before converting to RGB.
pub fn distort_color(frame: &Frame, hue_shift: f64, saturation_factor: f64) -> Result<Frame> {
    let size = frame.size();
    let mut data = Vec::with_capacity(size.pixel_count() * Frame::CHANNELS);
    for y in 0..size.height {
        for x in 0..size.width {
            let [h, s, v] = rgb_to_hsv8(frame.pixel(x, y));
            let h = (f64::from(h) + hue_shift).rem_euclid(180.0) as u8;
            let s = (f64::from(s) * saturation_factor).clamp(0.0, 255.0) as u8;
            data.extend_from_slice(&hsv8_to_rgb([h, s, v]));
        }
    }
    Frame::from_raw(size.width, size.height, Frame::CHANNELS, data)
}

/// Apply a channel-bias color cast.
pub fn shift_color(frame: &Frame, bias: ChannelBias, intensity: f64) -> Frame {
    let multipliers = bias.multipliers(intensity);
    let mut values = frame.to_f64();
    for (c, m) in multipliers.iter().enumerate() {
        values
            .index_axis_mut(ndarray::Axis(2), c)
            .mapv_inplace(|v| v * m);
    }
    Frame::quantize(&values)
}

/// Area-downsample by `scale` (never below [`MIN_RESOLUTION_SIDE`] per side)
/// and bilinearly upsample back to the original size.
pub fn reduce_resolution(frame: &Frame, scale: f64) -> Result<Frame> {
    let size = frame.size();
    let small = size.scaled_with_floor(scale, MIN_RESOLUTION_SIDE);
    if small == size {
        return Ok(frame.clone());
    }
    let down = Frame::quantize(&resize_area(&frame.to_f64(), small));
    resize_bilinear(&down, size)
}

/// Nearest-neighbour down to `side / block_size`, then back up.
pub fn pixelate(frame: &Frame, block_size: u32) -> Result<Frame> {
    let size = frame.size();
    let small: ImageSize = size.divided(block_size as usize);
    if small == size {
        return Ok(frame.clone());
    }
    resize_nearest(&resize_nearest(frame, small)?, size)
}

/// Gaussian blur; a non-positive sigma returns the input.
pub fn gaussian_blur(frame: &Frame, sigma: f64) -> Result<Frame> {
    if sigma <= 0.0 {
        return Ok(frame.clone());
    }
    let blurred = image::imageops::blur(&frame.to_rgb_image(), sigma as f32);
    Frame::from_rgb_image(&blurred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array3;

    fn checkerboard(size: usize, cell: usize) -> Frame {
        let pixels = Array3::from_shape_fn((size, size, 3), |(y, x, c)| {
            if ((x / cell) + (y / cell)) % 2 == 0 {
                200 - c as u8 * 20
            } else {
                30 + c as u8 * 10
            }
        });
        Frame::from_array(pixels).unwrap()
    }

    #[test]
    fn test_brightness_factor_bands() {
        let scale = LevelScale::default();
        assert_relative_eq!(brightness_factor(0, &scale).unwrap(), 1.0);
        assert_relative_eq!(brightness_factor(50, &scale).unwrap(), 0.2);
        assert_relative_eq!(brightness_factor(100, &scale).unwrap(), 2.5);
        assert!(brightness_factor(101, &scale).is_err());

        let dark: Vec<f64> = (0..=50)
            .map(|l| brightness_factor(l, &scale).unwrap())
            .collect();
        assert!(dark.windows(2).all(|w| w[1] < w[0]));
        let bright: Vec<f64> = (51..=100)
            .map(|l| brightness_factor(l, &scale).unwrap())
            .collect();
        assert!(bright.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_brightness_factor_odd_max_level() {
        let scale = LevelScale::new(99).unwrap();
        assert_relative_eq!(brightness_factor(99, &scale).unwrap(), 2.5);
        assert!(brightness_factor(49, &scale).unwrap() < 1.0);
        assert!(brightness_factor(50, &scale).unwrap() > 1.0);
    }

    #[test]
    fn test_factor_curves_are_monotonic() {
        let fractions: Vec<f64> = (0..=20).map(|i| i as f64 / 20.0).collect();
        for w in fractions.windows(2) {
            assert!(contrast_factor(w[1]) < contrast_factor(w[0]));
            assert!(saturation_factor(w[1]) > saturation_factor(w[0]));
            assert!(resolution_scale(w[1]) < resolution_scale(w[0]));
            assert!(blur_sigma(w[1]) > blur_sigma(w[0]));
            assert!(pixelation_block_size(w[1], 20) >= pixelation_block_size(w[0], 20));
        }
        assert_relative_eq!(contrast_factor(1.0), 0.01, epsilon = 1e-12);
        assert_relative_eq!(resolution_scale(1.0), 0.05, epsilon = 1e-12);
        assert_eq!(pixelation_block_size(0.0, 20), 1);
        assert_eq!(pixelation_block_size(1.0, 20), 21);
        assert_relative_eq!(hue_shift(0.5), 0.0);
    }

    #[test]
    fn test_brightness_clamps() {
        let frame = checkerboard(8, 2);
        let bright = adjust_brightness(&frame, 2.5);
        assert_eq!(bright.pixel(0, 0)[0], 255);
        let dark = adjust_brightness(&frame, 0.2);
        assert_eq!(dark.pixel(0, 0)[0], 40);
    }

    #[test]
    fn test_contrast_pulls_toward_mean() {
        let frame = checkerboard(8, 2);
        let flat = adjust_contrast(&frame, 0.01);
        let mean = frame.mean_value();
        for v in flat.pixels().iter() {
            assert!((f64::from(*v) - mean).abs() <= 2.0);
        }
        assert_eq!(adjust_contrast(&frame, 1.0), frame);
    }

    #[test]
    fn test_color_shift_biases() {
        let gray = Frame::filled(ImageSize::from_width_height(2, 2), [100, 100, 100]).unwrap();
        assert_eq!(
            shift_color(&gray, ChannelBias::Redward, 0.5).pixel(0, 0),
            [150, 85, 100]
        );
        assert_eq!(
            shift_color(&gray, ChannelBias::Cyanward, 1.0).pixel(0, 0),
            [50, 100, 100]
        );
        assert_eq!(ChannelBias::from_level(7), ChannelBias::Greenward);
        assert_eq!(ChannelBias::from_level(100), ChannelBias::Cyanward);
    }

    #[test]
    fn test_color_distortion_changes_hue() {
        let red = Frame::filled(ImageSize::from_width_height(2, 2), [220, 30, 30]).unwrap();
        let shifted = distort_color(&red, 60.0, 1.0).unwrap();
        let [r, g, b] = shifted.pixel(0, 0);
        // 120 degrees on from red is green
        assert!(g > r && g > b, "{:?}", [r, g, b]);

        let desaturated = distort_color(&red, 0.0, 0.0).unwrap();
        let [r, g, b] = desaturated.pixel(0, 0);
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_resolution_at_max_keeps_floor_and_degrades() {
        let frame = checkerboard(64, 1);
        let degraded = reduce_resolution(&frame, resolution_scale(1.0)).unwrap();
        assert_eq!(degraded.size(), frame.size());
        assert!(frame.mean_abs_difference(&degraded).unwrap() > 0.1);

        let small = frame.size().scaled_with_floor(resolution_scale(1.0), MIN_RESOLUTION_SIDE);
        assert_eq!(small, ImageSize::from_width_height(8, 8));
        assert_eq!(reduce_resolution(&frame, 1.0).unwrap(), frame);
    }

    #[test]
    fn test_pixelation_makes_uniform_blocks() {
        let frame = checkerboard(42, 1);
        let block = pixelation_block_size(1.0, 20);
        let out = pixelate(&frame, block).unwrap();
        assert_eq!(out.size(), frame.size());
        // 42 / 21 = 2 samples per side, each replicated over 21 pixels
        for y in 0..21 {
            for x in 0..21 {
                assert_eq!(out.pixel(x, y), out.pixel(0, 0));
            }
        }
        assert!(frame.mean_abs_difference(&out).unwrap() > 0.1);
        assert_eq!(pixelate(&frame, 1).unwrap(), frame);
    }

    #[test]
    fn test_blur_smooths_edges() {
        let frame = checkerboard(32, 4);
        assert_eq!(gaussian_blur(&frame, 0.0).unwrap(), frame);
        let blurred = gaussian_blur(&frame, blur_sigma(1.0)).unwrap();
        assert_eq!(blurred.size(), frame.size());
        assert!(crate::color::local_contrast(&blurred.channel_mean())
            < crate::color::local_contrast(&frame.channel_mean()));
    }
}
