//! Procedurally drawn lightness and color illusions.
//!
//! Each illusion is parameterized by a small set of named values. The
//! gradient sequencer walks those values across their declared ranges to
//! produce a series of frames in which the illusion is progressively
//! stronger or weaker. Rectangles are filled with inclusive corners, so
//! adjacent shapes overlap by one pixel the way classic raster drawing
//! libraries render them.

use ndarray::Array3;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::color::hsv::hsv_to_rgb;
use crate::error::Result;
use crate::frame::Frame;
use crate::gradient::{CurveBand, GradientSequencer, ParameterRange, ParameterSet};
use crate::image_size::ImageSize;

/// Default illusion canvas edge.
pub const DEFAULT_ILLUSION_SIDE: usize = 512;

const WHITE: [u8; 3] = [255, 255, 255];
const BLACK: [u8; 3] = [0, 0, 0];
const MID_GRAY: [u8; 3] = [128, 128, 128];
const LIGHT_GRAY: [u8; 3] = [211, 211, 211];

/// Raster target with clipped, inclusive rectangle fills.
#[derive(Debug, Clone)]
pub struct Canvas {
    pixels: Array3<u8>,
}

impl Canvas {
    pub fn new(size: ImageSize, background: [u8; 3]) -> Self {
        Self {
            pixels: Array3::from_shape_fn(size.rgb_shape(), |(_, _, c)| background[c]),
        }
    }

    pub fn width(&self) -> i64 {
        self.pixels.dim().1 as i64
    }

    pub fn height(&self) -> i64 {
        self.pixels.dim().0 as i64
    }

    /// Fill `[x0, x1] × [y0, y1]`, both ends inclusive, clipped to the canvas.
    pub fn fill_rect(&mut self, x0: i64, y0: i64, x1: i64, y1: i64, color: [u8; 3]) {
        let x_start = x0.max(0);
        let y_start = y0.max(0);
        let x_end = x1.min(self.width() - 1);
        let y_end = y1.min(self.height() - 1);
        for y in y_start..=y_end {
            for x in x_start..=x_end {
                for (c, value) in color.iter().enumerate() {
                    self.pixels[[y as usize, x as usize, c]] = *value;
                }
            }
        }
    }

    /// Fill the ellipse inscribed in `[x0, x1] × [y0, y1]`, with a ring of
    /// `outline_width` pixels drawn in `outline`.
    pub fn fill_ellipse(
        &mut self,
        (x0, y0, x1, y1): (i64, i64, i64, i64),
        fill: [u8; 3],
        outline: [u8; 3],
        outline_width: i64,
    ) {
        let cx = (x0 + x1) as f64 / 2.0;
        let cy = (y0 + y1) as f64 / 2.0;
        let rx = (x1 - x0) as f64 / 2.0;
        let ry = (y1 - y0) as f64 / 2.0;
        if rx <= 0.0 || ry <= 0.0 {
            return;
        }
        let inside = |x: i64, y: i64, rx: f64, ry: f64| {
            if rx <= 0.0 || ry <= 0.0 {
                return false;
            }
            let dx = (x as f64 - cx) / rx;
            let dy = (y as f64 - cy) / ry;
            dx * dx + dy * dy <= 1.0
        };
        let inner = (outline_width.max(0)) as f64;
        for y in y0.max(0)..=y1.min(self.height() - 1) {
            for x in x0.max(0)..=x1.min(self.width() - 1) {
                if !inside(x, y, rx, ry) {
                    continue;
                }
                let color = if inside(x, y, rx - inner, ry - inner) {
                    fill
                } else {
                    outline
                };
                for (c, value) in color.iter().enumerate() {
                    self.pixels[[y as usize, x as usize, c]] = *value;
                }
            }
        }
    }

    /// Darken `width` strips right of `start`, strip `i` with `alpha(i)`.
    ///
    /// Strip `i` covers columns `start + i` and `start + i + 1`; later strips
    /// overwrite the shared column.
    fn cast_shadow<F>(&mut self, start: i64, width: i64, alpha: F)
    where
        F: Fn(i64) -> u8,
    {
        if width <= 0 {
            return;
        }
        let mut alphas = vec![0u8; (width + 1) as usize];
        for i in 0..width {
            let a = alpha(i);
            alphas[i as usize] = a;
            alphas[i as usize + 1] = a;
        }
        for (offset, a) in alphas.into_iter().enumerate() {
            self.darken_column(start + offset as i64, a);
        }
    }

    /// Composite black over column `x` with the given alpha.
    fn darken_column(&mut self, x: i64, alpha: u8) {
        if x < 0 || x >= self.width() {
            return;
        }
        let keep = 255 - u32::from(alpha);
        let mut column = self.pixels.index_axis_mut(ndarray::Axis(1), x as usize);
        column.mapv_inplace(|v| ((u32::from(v) * keep + 127) / 255) as u8);
    }

    pub fn finish(self) -> Result<Frame> {
        Frame::from_array(self.pixels)
    }
}

/// The generated illusions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Illusion {
    /// Checkerboard under a graded vertical shadow
    CheckerShadow,
    /// Checkerboard with a standing cylinder casting a shadow to its right
    AdelsonCheckerboard,
    /// One hue interleaved with black on the left and white on the right
    BezoldEffect,
    /// Identical gray squares on dark and light backgrounds
    SimultaneousContrast,
    /// Two flat fields joined by an overshooting luminance ramp
    Cornsweet,
    /// Gray bars placed on the light or the dark stripes of a grating
    WhiteIllusion,
}

const CHECKER_SHADOW_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("intensity", 0.3, 1.8),
    ParameterRange::new("shadow_opacity", 0.2, 0.9),
    ParameterRange::new("checker_size", 20.0, 50.0),
];

const ADELSON_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("cylinder_height", 150.0, 250.0),
    ParameterRange::new("shadow_width", 60.0, 150.0),
    ParameterRange::new("checker_size", 15.0, 40.0),
];

const BEZOLD_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("hue", 0.0, 360.0),
    ParameterRange::new("stripe_width", 3.0, 15.0),
    ParameterRange::new("saturation", 0.4, 1.0),
];

const SIMULTANEOUS_CONTRAST_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("gray_value", 80.0, 180.0),
    ParameterRange::new("bg1_brightness", 20.0, 100.0),
    ParameterRange::new("bg2_brightness", 150.0, 235.0),
];

const CORNSWEET_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("gradient_width", 20.0, 100.0),
    ParameterRange::new("edge_contrast", 1.0, 3.0),
    ParameterRange::new("base_brightness", 100.0, 160.0),
];

const WHITE_RANGES: [ParameterRange; 3] = [
    ParameterRange::new("stripe_width", 5.0, 20.0),
    ParameterRange::new("gray_brightness", 100.0, 160.0),
    ParameterRange::new("background_brightness", 180.0, 255.0),
];

impl Illusion {
    pub const ALL: [Illusion; 6] = [
        Illusion::CheckerShadow,
        Illusion::AdelsonCheckerboard,
        Illusion::BezoldEffect,
        Illusion::SimultaneousContrast,
        Illusion::Cornsweet,
        Illusion::WhiteIllusion,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Illusion::CheckerShadow => "checker_shadow",
            Illusion::AdelsonCheckerboard => "adelson_checkerboard",
            Illusion::BezoldEffect => "bezold_effect",
            Illusion::SimultaneousContrast => "simultaneous_contrast",
            Illusion::Cornsweet => "cornsweet",
            Illusion::WhiteIllusion => "white_illusion",
        }
    }

    /// Named parameter ranges swept by the gradient sequencer.
    pub fn parameter_ranges(&self) -> &'static [ParameterRange] {
        match self {
            Illusion::CheckerShadow => &CHECKER_SHADOW_RANGES,
            Illusion::AdelsonCheckerboard => &ADELSON_RANGES,
            Illusion::BezoldEffect => &BEZOLD_RANGES,
            Illusion::SimultaneousContrast => &SIMULTANEOUS_CONTRAST_RANGES,
            Illusion::Cornsweet => &CORNSWEET_RANGES,
            Illusion::WhiteIllusion => &WHITE_RANGES,
        }
    }

    /// Classic presentation of the illusion.
    pub fn defaults(&self) -> ParameterSet {
        let values: &[(&str, f64)] = match self {
            Illusion::CheckerShadow => &[
                ("intensity", 1.0),
                ("shadow_opacity", 0.5),
                ("checker_size", 32.0),
            ],
            Illusion::AdelsonCheckerboard => &[
                ("cylinder_height", 200.0),
                ("shadow_width", 100.0),
                ("checker_size", 25.0),
            ],
            Illusion::BezoldEffect => {
                &[("hue", 0.0), ("stripe_width", 5.0), ("saturation", 0.8)]
            }
            Illusion::SimultaneousContrast => &[
                ("gray_value", 128.0),
                ("bg1_brightness", 50.0),
                ("bg2_brightness", 200.0),
            ],
            Illusion::Cornsweet => &[
                ("gradient_width", 50.0),
                ("edge_contrast", 2.0),
                ("base_brightness", 128.0),
            ],
            Illusion::WhiteIllusion => &[
                ("stripe_width", 8.0),
                ("gray_brightness", 128.0),
                ("background_brightness", 200.0),
            ],
        };
        values.iter().copied().collect()
    }

    /// Draw the illusion. Missing parameters take their default.
    pub fn render(&self, params: &ParameterSet, size: ImageSize) -> Result<Frame> {
        let defaults = self.defaults();
        let get = |name: &str| params.value_or(name, defaults.value_or(name, 0.0));
        match self {
            Illusion::CheckerShadow => checker_shadow(
                size,
                get("intensity"),
                get("shadow_opacity"),
                get("checker_size"),
            ),
            Illusion::AdelsonCheckerboard => adelson_checkerboard(
                size,
                get("cylinder_height"),
                get("shadow_width"),
                get("checker_size"),
            ),
            Illusion::BezoldEffect => {
                bezold(size, get("hue"), get("stripe_width"), get("saturation"))
            }
            Illusion::SimultaneousContrast => simultaneous_contrast(
                size,
                get("gray_value"),
                get("bg1_brightness"),
                get("bg2_brightness"),
            ),
            Illusion::Cornsweet => cornsweet(
                size,
                get("gradient_width"),
                get("edge_contrast"),
                get("base_brightness"),
            ),
            Illusion::WhiteIllusion => white(
                size,
                get("stripe_width"),
                get("gray_brightness"),
                get("background_brightness"),
            ),
        }
    }
}

impl std::fmt::Display for Illusion {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One frame of an illusion sequence.
#[derive(Debug, Clone)]
pub struct IllusionStep {
    pub index: u32,
    pub band: Option<CurveBand>,
    pub params: ParameterSet,
    pub frame: Frame,
}

/// Sweep an illusion's parameters with the sequencer and render each step.
pub fn render_sequence<R>(
    illusion: Illusion,
    sequencer: &GradientSequencer,
    size: ImageSize,
    rng: &mut R,
) -> Result<Vec<IllusionStep>>
where
    R: RngCore + ?Sized,
{
    sequencer
        .sequence_space(illusion.parameter_ranges(), rng)
        .into_iter()
        .map(|step| {
            let frame = illusion.render(&step.values, size)?;
            Ok(IllusionStep {
                index: step.index,
                band: step.band,
                params: step.values,
                frame,
            })
        })
        .collect()
}

fn gray(value: i64) -> [u8; 3] {
    [value.clamp(0, 255) as u8; 3]
}

fn checker_shadow(
    size: ImageSize,
    intensity: f64,
    shadow_opacity: f64,
    checker_size: f64,
) -> Result<Frame> {
    let mut canvas = Canvas::new(size, WHITE);
    let cell = (checker_size as i64).clamp(20, 50);
    let color = gray((128.0 * intensity) as i64);

    for y in (0..canvas.height()).step_by(cell as usize) {
        for x in (0..canvas.width()).step_by(cell as usize) {
            if (x / cell + y / cell) % 2 == 1 {
                canvas.fill_rect(x, y, x + cell, y + cell, color);
            }
        }
    }

    const SHADOW_WIDTH: i64 = 120;
    let start = canvas.width() / 2 - SHADOW_WIDTH / 2;
    canvas.cast_shadow(start, SHADOW_WIDTH, |i| {
        let alpha = (shadow_opacity * 255.0 * (1.0 - i as f64 / SHADOW_WIDTH as f64)) as i64;
        alpha.clamp(0, 255) as u8
    });

    canvas.finish()
}

fn adelson_checkerboard(
    size: ImageSize,
    cylinder_height: f64,
    shadow_width: f64,
    checker_size: f64,
) -> Result<Frame> {
    const CYLINDER_WIDTH: i64 = 80;
    const SHADOW_PEAK_ALPHA: f64 = 120.0;

    let mut canvas = Canvas::new(size, WHITE);
    let cell = (checker_size as i64).clamp(15, 40);
    for y in (0..canvas.height()).step_by(cell as usize) {
        for x in (0..canvas.width()).step_by(cell as usize) {
            if (x / cell + y / cell) % 2 == 1 {
                canvas.fill_rect(x, y, x + cell, y + cell, MID_GRAY);
            }
        }
    }

    let (cx, cy) = (canvas.width() / 2, canvas.height() / 2);
    let half_height = (cylinder_height as i64).clamp(150, 250) / 2;
    let half_width = CYLINDER_WIDTH / 2;
    canvas.fill_ellipse(
        (cx - half_width, cy - half_height, cx + half_width, cy + half_height),
        LIGHT_GRAY,
        BLACK,
        2,
    );

    let shadow = (shadow_width as i64).clamp(60, 150);
    canvas.cast_shadow(cx + half_width, shadow, |i| {
        (SHADOW_PEAK_ALPHA * (1.0 - i as f64 / shadow as f64)) as u8
    });

    canvas.finish()
}

fn bezold(size: ImageSize, hue: f64, stripe_width: f64, saturation: f64) -> Result<Frame> {
    let mut canvas = Canvas::new(size, WHITE);
    let stripe = (stripe_width as i64).clamp(3, 15);
    let panel = canvas.width() / 2;
    let rgb = hsv_to_rgb(hue, saturation, 0.8);
    let base = rgb.map(|c| (c * 255.0) as i64 as u8);

    for y in (0..canvas.height()).step_by((stripe * 2) as usize) {
        canvas.fill_rect(0, y, panel, y + stripe, base);
        canvas.fill_rect(0, y + stripe, panel, y + stripe * 2, BLACK);
    }
    for y in (0..canvas.height()).step_by((stripe * 2) as usize) {
        canvas.fill_rect(panel, y, canvas.width(), y + stripe, base);
        canvas.fill_rect(panel, y + stripe, canvas.width(), y + stripe * 2, WHITE);
    }

    canvas.finish()
}

fn simultaneous_contrast(
    size: ImageSize,
    gray_value: f64,
    bg1_brightness: f64,
    bg2_brightness: f64,
) -> Result<Frame> {
    let mut canvas = Canvas::new(size, WHITE);
    let patch = gray((gray_value as i64).clamp(80, 180));
    let dark = gray((bg1_brightness as i64).clamp(20, 100));
    let light = gray((bg2_brightness as i64).clamp(150, 235));
    let half = canvas.width() / 2;
    let (width, height) = (canvas.width(), canvas.height());

    canvas.fill_rect(0, 0, half, height, dark);
    canvas.fill_rect(half, 0, width, height, light);

    const SQUARE: i64 = 80;
    let cy = height / 2;
    for cx in [half / 2, half + half / 2] {
        canvas.fill_rect(
            cx - SQUARE / 2,
            cy - SQUARE / 2,
            cx + SQUARE / 2,
            cy + SQUARE / 2,
            patch,
        );
    }

    canvas.finish()
}

fn cornsweet(
    size: ImageSize,
    gradient_width: f64,
    edge_contrast: f64,
    base_brightness: f64,
) -> Result<Frame> {
    let mut canvas = Canvas::new(size, WHITE);
    let ramp = (gradient_width as i64).clamp(20, 100);
    let base = (base_brightness as i64).clamp(100, 160);
    let left = (base - 20).clamp(50, 200);
    let right = (base + 20).clamp(50, 200);
    let half = canvas.width() / 2;
    let (width, height) = (canvas.width(), canvas.height());

    canvas.fill_rect(0, 0, half - ramp / 2, height, gray(left));
    canvas.fill_rect(half + ramp / 2, 0, width, height, gray(right));

    for i in 0..ramp {
        let t = i as f64 / ramp as f64;
        let value = if t < 0.5 {
            (left as f64 + (255 - left) as f64 * edge_contrast * t * 2.0) as i64
        } else {
            (255.0 - (255 - right) as f64 * edge_contrast * (t - 0.5) * 2.0) as i64
        };
        let x = half - ramp / 2 + i;
        canvas.fill_rect(x, 0, x + 1, height, gray(value));
    }

    canvas.finish()
}

fn white(
    size: ImageSize,
    stripe_width: f64,
    gray_brightness: f64,
    background_brightness: f64,
) -> Result<Frame> {
    let mut canvas = Canvas::new(size, WHITE);
    let stripe = (stripe_width as i64).clamp(5, 20);
    let bar = gray((gray_brightness as i64).clamp(100, 160));
    let background = gray((background_brightness as i64).clamp(180, 255));
    let (width, height) = (canvas.width(), canvas.height());
    let step = (stripe * 2) as usize;

    for x in (0..width).step_by(step) {
        canvas.fill_rect(x, 0, x + stripe, height, background);
        canvas.fill_rect(x + stripe, 0, x + stripe * 2, height, BLACK);
    }

    const BAR_HEIGHT: i64 = 30;
    let cy = height / 2;
    for x in (0..width).step_by(step) {
        canvas.fill_rect(x, cy - 60, x + stripe, cy - 60 + BAR_HEIGHT, bar);
    }
    for x in (stripe..width).step_by(step) {
        canvas.fill_rect(x, cy + 30, x + stripe, cy + 30 + BAR_HEIGHT, bar);
    }

    canvas.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gradient::InterpolationPolicy;
    use crate::noise::seeded_rng;

    fn side() -> ImageSize {
        ImageSize::from_width_height(DEFAULT_ILLUSION_SIDE, DEFAULT_ILLUSION_SIDE)
    }

    #[test]
    fn test_inclusive_rect_is_clipped() {
        let mut canvas = Canvas::new(ImageSize::from_width_height(4, 4), WHITE);
        canvas.fill_rect(2, 2, 10, 10, BLACK);
        canvas.fill_rect(-5, -5, 0, 0, [1, 2, 3]);
        let frame = canvas.finish().unwrap();
        assert_eq!(frame.pixel(3, 3), [0, 0, 0]);
        assert_eq!(frame.pixel(2, 2), [0, 0, 0]);
        assert_eq!(frame.pixel(1, 1), [255, 255, 255]);
        assert_eq!(frame.pixel(0, 0), [1, 2, 3]);
    }

    #[test]
    fn test_every_illusion_renders_at_size() {
        for illusion in Illusion::ALL {
            let frame = illusion.render(&illusion.defaults(), side()).unwrap();
            assert_eq!(frame.size(), side(), "{illusion}");
        }
    }

    #[test]
    fn test_simultaneous_contrast_patches_match() {
        let frame = Illusion::SimultaneousContrast
            .render(&Illusion::SimultaneousContrast.defaults(), side())
            .unwrap();
        assert_eq!(frame.pixel(128, 256), [128, 128, 128]);
        assert_eq!(frame.pixel(384, 256), [128, 128, 128]);
        assert_eq!(frame.pixel(10, 10), [50, 50, 50]);
        assert_eq!(frame.pixel(500, 10), [200, 200, 200]);
    }

    #[test]
    fn test_checker_shadow_darkens_center() {
        let params: ParameterSet = [("intensity", 1.0), ("shadow_opacity", 0.9), ("checker_size", 20.0)]
            .into_iter()
            .collect();
        let frame = Illusion::CheckerShadow.render(&params, side()).unwrap();
        // Column 196 is the darkest part of the shadow
        let shadowed = frame.pixel(196, 5)[0];
        assert!(shadowed < 50, "{shadowed}");
        assert_eq!(frame.pixel(5, 5), [255, 255, 255]);
    }

    #[test]
    fn test_adelson_cylinder_and_shadow() {
        let defaults = Illusion::AdelsonCheckerboard.defaults();
        let frame = Illusion::AdelsonCheckerboard.render(&defaults, side()).unwrap();
        assert_eq!(frame.pixel(5, 5), [255, 255, 255]);
        assert_eq!(frame.pixel(30, 5), [128, 128, 128]);
        // Cylinder body with its outline ring at the top
        assert_eq!(frame.pixel(256, 256), [211, 211, 211]);
        assert_eq!(frame.pixel(256, 156), [0, 0, 0]);
        // Shadow starts at the right edge of the cylinder at alpha 120
        assert_eq!(frame.pixel(296, 5), [68, 68, 68]);
        assert_eq!(frame.pixel(410, 5), [255, 255, 255]);

        let mut tall = defaults.clone();
        tall.insert("cylinder_height", 250.0);
        let tall = Illusion::AdelsonCheckerboard.render(&tall, side()).unwrap();
        assert_eq!(frame.pixel(256, 136), [128, 128, 128]);
        assert_eq!(tall.pixel(256, 136), [211, 211, 211]);
    }

    #[test]
    fn test_bezold_panels_share_base_color() {
        let params: ParameterSet = [("hue", 120.0), ("stripe_width", 10.0), ("saturation", 1.0)]
            .into_iter()
            .collect();
        let frame = Illusion::BezoldEffect.render(&params, side()).unwrap();
        assert_eq!(frame.pixel(10, 5), [0, 204, 0]);
        assert_eq!(frame.pixel(400, 5), [0, 204, 0]);
        assert_eq!(frame.pixel(10, 15), [0, 0, 0]);
        assert_eq!(frame.pixel(400, 15), [255, 255, 255]);
    }

    #[test]
    fn test_cornsweet_ramp_overshoots() {
        let frame = Illusion::Cornsweet
            .render(&Illusion::Cornsweet.defaults(), side())
            .unwrap();
        assert_eq!(frame.pixel(10, 10), [108, 108, 108]);
        assert_eq!(frame.pixel(500, 10), [148, 148, 148]);
        let peak = (231..=281).map(|x| frame.pixel(x, 0)[0]).max().unwrap();
        assert_eq!(peak, 255);
    }

    #[test]
    fn test_white_bars_sit_on_opposite_stripes() {
        let frame = Illusion::WhiteIllusion
            .render(&Illusion::WhiteIllusion.defaults(), side())
            .unwrap();
        // stripe width 8: x = 3 is a light stripe, x = 11 a dark one
        assert_eq!(frame.pixel(3, 256 - 50), [128, 128, 128]);
        assert_eq!(frame.pixel(11, 256 - 50), [0, 0, 0]);
        assert_eq!(frame.pixel(11, 256 + 40), [128, 128, 128]);
        assert_eq!(frame.pixel(3, 256 + 40), [200, 200, 200]);
    }

    #[test]
    fn test_sequence_walks_parameter_ranges() {
        let sequencer = GradientSequencer::new(6, InterpolationPolicy::Banded).unwrap();
        let size = ImageSize::from_width_height(128, 128);
        let steps = render_sequence(
            Illusion::SimultaneousContrast,
            &sequencer,
            size,
            &mut seeded_rng(Some(4)),
        )
        .unwrap();
        assert_eq!(steps.len(), 6);
        assert_eq!(steps[0].params.get("gray_value"), Some(80.0));
        assert_eq!(steps[5].params.get("bg2_brightness"), Some(235.0));
        assert_eq!(steps[0].frame.pixel(5, 5), [20, 20, 20]);
    }
}
