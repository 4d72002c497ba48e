//! Write-once records describing what a batch produced.

use std::path::Path;

use chrono::{DateTime, Utc};
use degrade::{DegradationKind, Leveled, ParameterSet, Parameters};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Metadata stored next to every variant image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    /// Identifier of the source image
    pub source: String,
    pub kind: DegradationKind,
    pub level: u32,
    pub parameters: Parameters,
    /// Output image file name, relative to the sequence directory
    pub output: String,
    pub width: usize,
    pub height: usize,
}

impl Leveled for VariantRecord {
    fn level(&self) -> u32 {
        self.level
    }
}

impl VariantRecord {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

/// Every variant of one source image under one kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceManifest {
    pub source: String,
    pub kind: DegradationKind,
    pub max_level: u32,
    /// Seed of the per-variant random streams
    pub seed: u64,
    /// Records in ascending level order
    pub variants: Vec<VariantRecord>,
}

impl SequenceManifest {
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }
}

/// Metadata for one frame of an illusion sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IllusionRecord {
    pub illusion: String,
    pub index: u32,
    pub total_steps: u32,
    pub params: ParameterSet,
    pub output: String,
    pub width: usize,
    pub height: usize,
}

impl Leveled for IllusionRecord {
    fn level(&self) -> u32 {
        self.index
    }
}

/// Metadata for one frame of a dichromacy severity gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeverityRecord {
    pub source: String,
    pub kind: DegradationKind,
    pub step: u32,
    pub num_steps: u32,
    pub severity: f64,
    pub improved: bool,
    pub output: String,
    pub width: usize,
    pub height: usize,
}

impl Leveled for SeverityRecord {
    fn level(&self) -> u32 {
        self.step
    }
}

/// An item the batch could not produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedItem {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<DegradationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    pub error: String,
}

/// Totals for a finished batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub generated_at: DateTime<Utc>,
    pub seed: u64,
    pub total_sources: usize,
    pub kinds: Vec<DegradationKind>,
    pub levels_per_source: usize,
    pub expected_variants: usize,
    pub written_variants: usize,
    pub failed: Vec<FailedItem>,
}

impl BatchReport {
    /// Written over expected variants, in `[0, 1]`. An empty batch is
    /// complete.
    pub fn completion_rate(&self) -> f64 {
        if self.expected_variants == 0 {
            1.0
        } else {
            self.written_variants as f64 / self.expected_variants as f64
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        read_json(path)
    }
}

pub(crate) fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}
