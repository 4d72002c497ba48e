//! RGB/HSV conversion.
//!
//! The 8-bit form stores hue in half-degree units in `[0, 180)` and
//! saturation and value in `[0, 255]`, the packing used by common image
//! tooling for byte images. The float form works in degrees and unit
//! saturation/value.

/// Convert one 8-bit RGB pixel to packed 8-bit HSV.
pub fn rgb_to_hsv8(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f64::from);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { (diff * 255.0 / v).round() };

    let h = if diff == 0.0 {
        0.0
    } else {
        let sector = if v == r {
            g - b
        } else if v == g {
            b - r + 2.0 * diff
        } else {
            r - g + 4.0 * diff
        };
        let mut h = (30.0 * sector / diff).round();
        if h < 0.0 {
            h += 180.0;
        }
        if h >= 180.0 {
            h -= 180.0;
        }
        h
    };

    [h as u8, s as u8, v as u8]
}

/// Convert packed 8-bit HSV back to 8-bit RGB.
pub fn hsv8_to_rgb(hsv: [u8; 3]) -> [u8; 3] {
    let h = f64::from(hsv[0]) * 2.0;
    let s = f64::from(hsv[1]) / 255.0;
    let v = f64::from(hsv[2]) / 255.0;
    hsv_to_rgb(h, s, v).map(|c| (c * 255.0).round().clamp(0.0, 255.0) as u8)
}

/// Float HSV to RGB. Hue in degrees (wrapped), saturation and value in
/// `[0, 1]`; returns channels in `[0, 1]`.
pub fn hsv_to_rgb(hue_degrees: f64, saturation: f64, value: f64) -> [f64; 3] {
    if saturation <= 0.0 {
        return [value; 3];
    }
    let h = hue_degrees.rem_euclid(360.0) / 60.0;
    let sector = h.floor();
    let f = h - sector;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    match sector as u32 % 6 {
        0 => [value, t, p],
        1 => [q, value, p],
        2 => [p, value, t],
        3 => [p, q, value],
        4 => [t, p, value],
        _ => [value, p, q],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_primary_hues() {
        assert_eq!(rgb_to_hsv8([255, 0, 0]), [0, 255, 255]);
        assert_eq!(rgb_to_hsv8([0, 255, 0]), [60, 255, 255]);
        assert_eq!(rgb_to_hsv8([0, 0, 255]), [120, 255, 255]);
        assert_eq!(rgb_to_hsv8([255, 0, 255]), [150, 255, 255]);
    }

    #[test]
    fn test_gray_has_no_hue_or_saturation() {
        assert_eq!(rgb_to_hsv8([90, 90, 90]), [0, 0, 90]);
        assert_eq!(rgb_to_hsv8([0, 0, 0]), [0, 0, 0]);
    }

    #[test]
    fn test_round_trip_is_close() {
        for rgb in [[255, 0, 0], [12, 200, 90], [250, 250, 10], [40, 60, 80]] {
            let back = hsv8_to_rgb(rgb_to_hsv8(rgb));
            for c in 0..3 {
                assert!(
                    (i32::from(back[c]) - i32::from(rgb[c])).abs() <= 4,
                    "{rgb:?} -> {back:?}"
                );
            }
        }
    }

    #[test]
    fn test_float_conversion_sectors() {
        let yellow = hsv_to_rgb(60.0, 1.0, 1.0);
        assert_abs_diff_eq!(yellow[0], 1.0);
        assert_abs_diff_eq!(yellow[1], 1.0);
        assert_abs_diff_eq!(yellow[2], 0.0);

        let wrapped = hsv_to_rgb(360.0 + 240.0, 1.0, 0.5);
        assert_abs_diff_eq!(wrapped[2], 0.5);
        assert_abs_diff_eq!(wrapped[0], 0.0);
    }
}
