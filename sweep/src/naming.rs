//! Output file naming.
//!
//! Every variant image gets a sibling JSON record with the same stem, so
//! `protanopia_042.png` sits next to `protanopia_042.json`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use degrade::{DegradationKind, LevelScale};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};

/// Extension of per-variant metadata records.
pub const METADATA_EXTENSION: &str = "json";

/// File name of the per-sequence manifest.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// How variant files are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingStyle {
    /// `{kind}_{level:03}.png`
    #[default]
    Level,
    /// `{kind}_severity_{fraction:.2}.png`
    Severity,
}

impl NamingStyle {
    /// File name for one variant.
    pub fn file_name(&self, kind: DegradationKind, level: u32, scale: &LevelScale) -> Result<String> {
        match self {
            NamingStyle::Level => Ok(level_file_name(kind, level)),
            NamingStyle::Severity => {
                let fraction = scale.fraction(level)?;
                Ok(severity_file_name(kind.as_str(), fraction))
            }
        }
    }

    /// Severity names keep two decimals, so they stay unique only up to a
    /// 100-level scale.
    pub fn check_scale(&self, scale: &LevelScale) -> Result<()> {
        if *self == NamingStyle::Severity && scale.max_level() > 100 {
            return Err(SweepError::InvalidConfig(format!(
                "severity naming cannot distinguish {} levels",
                scale.max_level() + 1
            )));
        }
        Ok(())
    }
}

pub fn level_file_name(kind: DegradationKind, level: u32) -> String {
    format!("{kind}_{level:03}.png")
}

pub fn severity_file_name(prefix: &str, severity: f64) -> String {
    format!("{prefix}_severity_{severity:.2}.png")
}

/// Frame `step` of a dichromacy severity gradient.
pub fn severity_step_file_name(kind: DegradationKind, step: u32) -> String {
    format!("{kind}_severity_{step:03}.png")
}

pub fn gradient_file_name(index: u32) -> String {
    format!("gradient_{index:03}.png")
}

/// Sibling metadata path for an output image.
pub fn metadata_path(image_path: &Path) -> PathBuf {
    image_path.with_extension(METADATA_EXTENSION)
}

/// Identifier of a source image: its file stem, or the whole path when it
/// has none.
pub fn source_id(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Identifiers for a batch of source paths, one per path.
///
/// The first path with a given stem keeps it; later ones get `_2`, `_3`, ...
/// appended until the identifier is unused.
pub fn unique_source_ids(paths: &[PathBuf]) -> Vec<String> {
    let mut used = HashSet::with_capacity(paths.len());
    paths
        .iter()
        .map(|path| {
            let stem = source_id(path);
            let mut id = stem.clone();
            let mut suffix = 2;
            while used.contains(&id) {
                id = format!("{stem}_{suffix}");
                suffix += 1;
            }
            used.insert(id.clone());
            id
        })
        .collect()
}

/// Directory holding every variant of one source under one kind.
pub fn sequence_dir(root: &Path, kind: DegradationKind, source: &str) -> PathBuf {
    root.join(kind.as_str()).join(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_names_are_zero_padded() {
        assert_eq!(
            level_file_name(DegradationKind::Protanopia, 7),
            "protanopia_007.png"
        );
        assert_eq!(
            level_file_name(DegradationKind::SaltPepperNoise, 100),
            "salt_pepper_noise_100.png"
        );
        assert_eq!(gradient_file_name(42), "gradient_042.png");
    }

    #[test]
    fn test_severity_names_use_level_fraction() {
        let scale = LevelScale::new(100).unwrap();
        let name = NamingStyle::Severity
            .file_name(DegradationKind::Deuteranopia, 35, &scale)
            .unwrap();
        assert_eq!(name, "deuteranopia_severity_0.35.png");
        assert_eq!(severity_file_name("tritanopia", 1.0), "tritanopia_severity_1.00.png");
        assert_eq!(
            severity_step_file_name(DegradationKind::Protanopia, 4),
            "protanopia_severity_004.png"
        );
    }

    #[test]
    fn test_severity_naming_rejects_fine_scales() {
        assert!(NamingStyle::Severity
            .check_scale(&LevelScale::new(100).unwrap())
            .is_ok());
        assert!(NamingStyle::Severity
            .check_scale(&LevelScale::new(1000).unwrap())
            .is_err());
        assert!(NamingStyle::Level
            .check_scale(&LevelScale::new(1000).unwrap())
            .is_ok());
    }

    #[test]
    fn test_metadata_sits_next_to_image() {
        let image = Path::new("out/blur/cat/blur_010.png");
        assert_eq!(metadata_path(image), Path::new("out/blur/cat/blur_010.json"));
        assert_eq!(source_id(Path::new("/data/cat.jpg")), "cat");
        assert_eq!(
            sequence_dir(Path::new("out"), DegradationKind::Blur, "cat"),
            Path::new("out/blur/cat")
        );
    }

    #[test]
    fn test_repeated_stems_get_distinct_ids() {
        let paths = [
            PathBuf::from("a/cat.png"),
            PathBuf::from("b/cat.png"),
            PathBuf::from("c/cat_2.jpg"),
            PathBuf::from("d/cat.bmp"),
            PathBuf::from("dog.png"),
        ];
        assert_eq!(
            unique_source_ids(&paths),
            vec!["cat", "cat_2", "cat_2_2", "cat_3", "dog"]
        );
    }
}
