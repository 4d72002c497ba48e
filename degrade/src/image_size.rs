//! Image dimensions and size utilities

use serde::{Deserialize, Serialize};
use std::fmt;

/// Image dimensions structure
///
/// Width and height of a frame in pixels. Array shapes built from an
/// `ImageSize` follow the row-major `(height, width, channel)` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl ImageSize {
    /// Create a new ImageSize
    pub fn from_width_height(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Get total number of pixels
    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }

    /// True when either side is zero
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Shape of an RGB array with this size: (height, width, 3)
    pub fn rgb_shape(&self) -> (usize, usize, usize) {
        (self.height, self.width, 3)
    }

    /// Scale both sides, flooring each and never going below `min_side`.
    pub fn scaled_with_floor(&self, scale: f64, min_side: usize) -> Self {
        let width = ((self.width as f64 * scale).floor() as usize).max(min_side);
        let height = ((self.height as f64 * scale).floor() as usize).max(min_side);
        Self { width, height }
    }

    /// Integer-divide both sides by `divisor`, never going below one pixel.
    pub fn divided(&self, divisor: usize) -> Self {
        let divisor = divisor.max(1);
        Self {
            width: (self.width / divisor).max(1),
            height: (self.height / divisor).max(1),
        }
    }
}

impl From<(usize, usize)> for ImageSize {
    fn from(dimensions: (usize, usize)) -> Self {
        Self::from_width_height(dimensions.0, dimensions.1)
    }
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
