//! Three-channel 8-bit frames.
//!
//! A [`Frame`] is the read-only image that flows through every transform. It
//! wraps an `ndarray::Array3<u8>` with shape `(height, width, 3)`; all
//! constructors enforce non-zero dimensions and exactly three channels.
//! Transforms work on `f64` copies and come back through [`Frame::quantize`],
//! which clamps to `[0, 255]` and rounds to the nearest code value.

use std::path::Path;

use image::{DynamicImage, RgbImage};
use ndarray::{Array3, ArrayView3, Axis, Zip};

use crate::error::{DegradeError, Result};
use crate::image_size::ImageSize;

/// Largest channel code value.
pub const MAX_CODE: f64 = 255.0;

/// An immutable RGB frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pixels: Array3<u8>,
}

impl Frame {
    /// Number of color channels carried by every frame.
    pub const CHANNELS: usize = 3;

    /// Wrap an existing `(height, width, channels)` array.
    ///
    /// # Errors
    /// `InvalidImageFormat` when the array is empty or does not have exactly
    /// three channels.
    pub fn from_array(pixels: Array3<u8>) -> Result<Self> {
        let (height, width, channels) = pixels.dim();
        if width == 0 || height == 0 {
            return Err(DegradeError::InvalidImageFormat(format!(
                "image has zero size ({width}x{height})"
            )));
        }
        if channels != Self::CHANNELS {
            return Err(DegradeError::InvalidImageFormat(format!(
                "expected 3 color channels, found {channels}"
            )));
        }
        Ok(Self { pixels })
    }

    /// Build a frame from an interleaved, row-major byte buffer.
    pub fn from_raw(width: usize, height: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if channels != Self::CHANNELS {
            return Err(DegradeError::InvalidImageFormat(format!(
                "expected 3 color channels, found {channels}"
            )));
        }
        let pixels = Array3::from_shape_vec((height, width, channels), data).map_err(|e| {
            DegradeError::InvalidImageFormat(format!(
                "buffer does not match {width}x{height}x{channels}: {e}"
            ))
        })?;
        Self::from_array(pixels)
    }

    /// A frame filled with one color.
    pub fn filled(size: ImageSize, rgb: [u8; 3]) -> Result<Self> {
        let pixels = Array3::from_shape_fn(size.rgb_shape(), |(_, _, c)| rgb[c]);
        Self::from_array(pixels)
    }

    /// Copy an 8-bit RGB image into a frame.
    pub fn from_rgb_image(image: &RgbImage) -> Result<Self> {
        let (width, height) = image.dimensions();
        Self::from_raw(
            width as usize,
            height as usize,
            Self::CHANNELS,
            image.as_raw().clone(),
        )
    }

    /// Normalize any decoded image to three-channel 8-bit color.
    ///
    /// Gray images are expanded and alpha channels are dropped, matching the
    /// "convert to RGB on load" behaviour every generator relies on.
    pub fn from_dynamic(image: &DynamicImage) -> Result<Self> {
        Self::from_rgb_image(&image.to_rgb8())
    }

    /// Decode an image file (PNG, JPEG, BMP, TIFF, ...) into a frame.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let decoded = image::open(path.as_ref())?;
        Self::from_dynamic(&decoded)
    }

    /// Encode the frame; the format follows the path extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_rgb_image().save(path.as_ref())?;
        Ok(())
    }

    /// Convert to an `image::RgbImage`.
    pub fn to_rgb_image(&self) -> RgbImage {
        let size = self.size();
        let raw: Vec<u8> = self.pixels.iter().copied().collect();
        RgbImage::from_raw(size.width as u32, size.height as u32, raw)
            .unwrap_or_else(|| RgbImage::new(size.width as u32, size.height as u32))
    }

    pub fn size(&self) -> ImageSize {
        let (height, width, _) = self.pixels.dim();
        ImageSize::from_width_height(width, height)
    }

    pub fn width(&self) -> usize {
        self.size().width
    }

    pub fn height(&self) -> usize {
        self.size().height
    }

    /// Borrow the underlying `(height, width, 3)` array.
    pub fn pixels(&self) -> ArrayView3<'_, u8> {
        self.pixels.view()
    }

    /// RGB value at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        [
            self.pixels[[y, x, 0]],
            self.pixels[[y, x, 1]],
            self.pixels[[y, x, 2]],
        ]
    }

    /// Channel values as `f64` in `[0, 255]`.
    pub fn to_f64(&self) -> Array3<f64> {
        self.pixels.mapv(f64::from)
    }

    /// Channel values normalized to `[0, 1]`.
    pub fn to_unit(&self) -> Array3<f64> {
        self.pixels.mapv(|v| f64::from(v) / MAX_CODE)
    }

    /// Clamp to `[0, 255]` and round. The array must keep the frame shape
    /// invariants, which holds for every transform in this crate.
    pub(crate) fn quantize(values: &Array3<f64>) -> Self {
        Self {
            pixels: values.mapv(quantize_code),
        }
    }

    /// Same as [`Frame::quantize`] for values normalized to `[0, 1]`.
    pub(crate) fn quantize_unit(values: &Array3<f64>) -> Self {
        Self {
            pixels: values.mapv(|v| quantize_code(v.clamp(0.0, 1.0) * MAX_CODE)),
        }
    }

    /// Mean over every channel of every pixel, in code values.
    pub fn mean_value(&self) -> f64 {
        let sum: u64 = self.pixels.iter().map(|&v| u64::from(v)).sum();
        sum as f64 / self.pixels.len() as f64
    }

    /// Per-pixel mean across the three channels, shape `(height, width)`.
    pub fn channel_mean(&self) -> ndarray::Array2<f64> {
        self.to_unit()
            .mean_axis(Axis(2))
            .unwrap_or_else(|| ndarray::Array2::zeros((self.height(), self.width())))
    }

    /// Mean absolute channel difference against another frame, normalized to
    /// `[0, 1]`.
    ///
    /// # Errors
    /// `InvalidImageFormat` when the frames differ in size.
    pub fn mean_abs_difference(&self, other: &Frame) -> Result<f64> {
        if self.size() != other.size() {
            return Err(DegradeError::InvalidImageFormat(format!(
                "cannot compare {} frame against {} frame",
                self.size(),
                other.size()
            )));
        }
        let mut total = 0u64;
        Zip::from(&self.pixels)
            .and(&other.pixels)
            .for_each(|&a, &b| total += u64::from(a.abs_diff(b)));
        Ok(total as f64 / self.pixels.len() as f64 / MAX_CODE)
    }

    /// Largest absolute channel difference against another frame.
    pub fn max_abs_difference(&self, other: &Frame) -> Result<u8> {
        if self.size() != other.size() {
            return Err(DegradeError::InvalidImageFormat(format!(
                "cannot compare {} frame against {} frame",
                self.size(),
                other.size()
            )));
        }
        let mut worst = 0u8;
        Zip::from(&self.pixels)
            .and(&other.pixels)
            .for_each(|&a, &b| worst = worst.max(a.abs_diff(b)));
        Ok(worst)
    }
}

/// Clamp a value to the code range and round to the nearest integer.
pub(crate) fn quantize_code(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, MAX_CODE).round() as u8
}
