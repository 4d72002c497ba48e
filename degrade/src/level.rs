//! Level scale and range validation.
//!
//! A level is an ordinal position in `[0, max_level]`, where 0 means "no
//! degradation" and `max_level` means "maximum degradation". Generators in the
//! benchmark use either 99 or 100 as the top level, so the bound is carried as
//! data rather than baked into the formulas.

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::error::{DegradeError, Result};

/// Default top level used by the degradation generators.
pub const DEFAULT_MAX_LEVEL: u32 = 100;

/// Largest supported top level. Levels must fit in 24 bits so they can
/// address per-variant random streams.
pub const MAX_LEVEL_LIMIT: u32 = (1 << 24) - 1;

/// Bounded integer level range `[0, max_level]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelScale {
    max_level: u32,
}

impl LevelScale {
    /// Create a level scale. `max_level` must lie in `[1, MAX_LEVEL_LIMIT]`.
    pub fn new(max_level: u32) -> Result<Self> {
        if max_level == 0 {
            return Err(DegradeError::InvalidConfig(
                "max_level must be at least 1".to_string(),
            ));
        }
        if max_level > MAX_LEVEL_LIMIT {
            return Err(DegradeError::InvalidConfig(format!(
                "max_level must be at most {MAX_LEVEL_LIMIT}, got {max_level}"
            )));
        }
        Ok(Self { max_level })
    }

    pub fn max_level(&self) -> u32 {
        self.max_level
    }

    /// Validate a level against this scale.
    pub fn check(&self, level: u32) -> Result<u32> {
        if level > self.max_level {
            return Err(DegradeError::out_of_range(
                "level",
                level as f64,
                0.0,
                self.max_level as f64,
            ));
        }
        Ok(level)
    }

    /// Normalized position `level / max_level` in `[0, 1]`.
    pub fn fraction(&self, level: u32) -> Result<f64> {
        self.check(level)
            .map(|level| level as f64 / self.max_level as f64)
    }

    /// Nearest level to a normalized position, clamped into the scale.
    pub fn level_at(&self, fraction: f64) -> u32 {
        let clamped = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        (clamped * self.max_level as f64).round() as u32
    }

    /// Every level of the scale, in order.
    pub fn levels(&self) -> RangeInclusive<u32> {
        0..=self.max_level
    }
}

impl Default for LevelScale {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
        }
    }
}

/// Validate a blend severity in `[0, 1]`.
pub fn check_severity(severity: f64) -> Result<f64> {
    if !(0.0..=1.0).contains(&severity) {
        return Err(DegradeError::out_of_range("severity", severity, 0.0, 1.0));
    }
    Ok(severity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_max_level_rejected() {
        assert!(matches!(
            LevelScale::new(0),
            Err(DegradeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_oversized_max_level_rejected() {
        assert!(LevelScale::new(MAX_LEVEL_LIMIT).is_ok());
        assert!(matches!(
            LevelScale::new(MAX_LEVEL_LIMIT + 1),
            Err(DegradeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_check_bounds() {
        let scale = LevelScale::new(99).unwrap();
        assert_eq!(scale.check(0).unwrap(), 0);
        assert_eq!(scale.check(99).unwrap(), 99);
        assert!(matches!(
            scale.check(100),
            Err(DegradeError::ParameterOutOfRange { name: "level", .. })
        ));
    }

    #[test]
    fn test_fraction() {
        let scale = LevelScale::default();
        assert_relative_eq!(scale.fraction(0).unwrap(), 0.0);
        assert_relative_eq!(scale.fraction(25).unwrap(), 0.25);
        assert_relative_eq!(scale.fraction(100).unwrap(), 1.0);
    }

    #[test]
    fn test_level_at_clamps() {
        let scale = LevelScale::new(99).unwrap();
        assert_eq!(scale.level_at(-0.5), 0);
        assert_eq!(scale.level_at(0.5), 50);
        assert_eq!(scale.level_at(2.0), 99);
        assert_eq!(scale.level_at(f64::NAN), 0);
    }

    #[test]
    fn test_severity_bounds() {
        assert!(check_severity(0.0).is_ok());
        assert!(check_severity(1.0).is_ok());
        assert!(check_severity(1.01).is_err());
        assert!(check_severity(-0.01).is_err());
        assert!(check_severity(f64::NAN).is_err());
    }

    #[test]
    fn test_levels_iterates_inclusive() {
        let scale = LevelScale::new(3).unwrap();
        assert_eq!(scale.levels().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }
}
