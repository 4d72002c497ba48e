//! Batch configuration.

use std::path::{Path, PathBuf};

use degrade::{DegradationKind, EngineConfig};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::naming::NamingStyle;
use crate::record::{read_json, write_json};

/// What to generate and where to put it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Root directory of the generated dataset
    pub output_root: PathBuf,
    /// Kind names to generate; empty means every kind
    pub kinds: Vec<String>,
    /// Levels to generate; `None` means the whole scale
    pub levels: Option<Vec<u32>>,
    pub naming: NamingStyle,
    /// Worker threads; `None` uses the global rayon pool
    pub threads: Option<usize>,
    /// Write one manifest per source and kind
    pub write_manifests: bool,
    pub show_progress: bool,
    pub engine: EngineConfig,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("degraded"),
            kinds: Vec::new(),
            levels: None,
            naming: NamingStyle::Level,
            threads: None,
            write_manifests: true,
            show_progress: false,
            engine: EngineConfig::default(),
        }
    }
}

impl SweepConfig {
    /// Kinds named by the configuration, in canonical order without
    /// duplicates.
    ///
    /// # Errors
    /// `UnsupportedDegradationKind` for the first unknown name.
    pub fn parse_kinds(&self) -> Result<Vec<DegradationKind>> {
        if self.kinds.is_empty() {
            return Ok(DegradationKind::ALL.to_vec());
        }
        let mut kinds = self
            .kinds
            .iter()
            .map(|name| name.parse::<DegradationKind>())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        kinds.sort();
        kinds.dedup();
        Ok(kinds)
    }

    /// Levels to generate, sorted and deduplicated.
    ///
    /// # Errors
    /// `ParameterOutOfRange` when a level exceeds the engine's scale,
    /// `InvalidConfig` when an explicit list is empty.
    pub fn resolved_levels(&self) -> Result<Vec<u32>> {
        let scale = self.engine.level_scale()?;
        match &self.levels {
            None => Ok(scale.levels().collect()),
            Some(levels) if levels.is_empty() => Err(SweepError::InvalidConfig(
                "explicit level list is empty".to_string(),
            )),
            Some(levels) => {
                let mut levels = levels
                    .iter()
                    .map(|&level| scale.check(level))
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                levels.sort_unstable();
                levels.dedup();
                Ok(levels)
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.naming.check_scale(&self.engine.level_scale()?)?;
        if self.threads == Some(0) {
            return Err(SweepError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        self.parse_kinds()?;
        self.resolved_levels()?;
        Ok(())
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use degrade::DegradeError;
    use tempfile::tempdir;

    #[test]
    fn test_empty_kind_list_means_every_kind() {
        let config = SweepConfig::default();
        assert_eq!(config.parse_kinds().unwrap().len(), DegradationKind::ALL.len());
        assert_eq!(config.resolved_levels().unwrap().len(), 101);
    }

    #[test]
    fn test_kinds_parsed_up_front() {
        let config = SweepConfig {
            kinds: vec!["pixelation".into(), "Gaussian-Noise".into(), "pixelation".into()],
            ..SweepConfig::default()
        };
        assert_eq!(
            config.parse_kinds().unwrap(),
            vec![DegradationKind::GaussianNoise, DegradationKind::Pixelation]
        );

        let bad = SweepConfig {
            kinds: vec!["vignette".into()],
            ..SweepConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(SweepError::Degrade(DegradeError::UnsupportedDegradationKind(_)))
        ));
    }

    #[test]
    fn test_levels_checked_against_scale() {
        let config = SweepConfig {
            levels: Some(vec![50, 0, 50, 99]),
            ..SweepConfig::default()
        };
        assert_eq!(config.resolved_levels().unwrap(), vec![0, 50, 99]);

        let too_high = SweepConfig {
            levels: Some(vec![101]),
            ..SweepConfig::default()
        };
        assert!(too_high.resolved_levels().is_err());

        let empty = SweepConfig {
            levels: Some(Vec::new()),
            ..SweepConfig::default()
        };
        assert!(matches!(
            empty.resolved_levels(),
            Err(SweepError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sweep.json");
        std::fs::write(&path, r#"{ "kinds": ["blur"], "engine": { "max_level": 99 } }"#).unwrap();
        let config = SweepConfig::load_from_file(&path).unwrap();
        assert_eq!(config.kinds, vec!["blur".to_string()]);
        assert_eq!(config.engine.max_level, 99);
        assert_eq!(config.engine.gaussian_scale, 50.0);
        assert!(config.write_manifests);
        config.validate().unwrap();

        let saved = dir.path().join("saved.json");
        config.save_to_file(&saved).unwrap();
        assert_eq!(SweepConfig::load_from_file(&saved).unwrap(), config);
    }
}
