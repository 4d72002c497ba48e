//! Parallel fan-out over sources × kinds × levels.
//!
//! Each (source, kind) pair is one rayon task that writes its own sequence
//! directory, so no two tasks ever write the same path. Every variant draws
//! from its own ChaCha stream keyed by (source index, kind, level), which
//! keeps stochastic output identical across thread counts and reruns with
//! the same seed.
//!
//! Failures are caught per item: a source that does not decode, or a variant
//! that cannot be written, is logged, recorded in the [`BatchReport`], and
//! the sweep carries on.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Utc;
use degrade::color::severity_gradient;
use degrade::illusion::render_sequence;
use degrade::{
    DegradationEngine, DegradationKind, Dichromacy, Frame, GradientSequencer, Illusion,
    ImageSize,
};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

use crate::config::SweepConfig;
use crate::error::{Result, SweepError};
use crate::naming::{
    gradient_file_name, metadata_path, sequence_dir, severity_step_file_name,
    unique_source_ids, MANIFEST_FILE_NAME,
};
use crate::record::{
    write_json, BatchReport, FailedItem, IllusionRecord, SequenceManifest, SeverityRecord,
    VariantRecord,
};

/// A decoded source image and its identifier.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: String,
    pub frame: Frame,
}

/// Outcome of one (source, kind) task.
struct SequenceOutcome {
    written: usize,
    failed: Vec<FailedItem>,
}

/// Drives the engine over a batch and persists the results.
pub struct BatchOrchestrator {
    config: SweepConfig,
    engine: DegradationEngine,
    kinds: Vec<DegradationKind>,
    levels: Vec<u32>,
}

impl BatchOrchestrator {
    /// # Errors
    /// Any configuration problem, including unknown kind names, is reported
    /// here rather than during the run.
    pub fn new(config: SweepConfig) -> Result<Self> {
        config.validate()?;
        let kinds = config.parse_kinds()?;
        let levels = config.resolved_levels()?;
        let engine = DegradationEngine::with_kinds(config.engine.clone(), kinds.iter().copied())?;
        Ok(Self {
            config,
            engine,
            kinds,
            levels,
        })
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn engine(&self) -> &DegradationEngine {
        &self.engine
    }

    pub fn kinds(&self) -> &[DegradationKind] {
        &self.kinds
    }

    pub fn levels(&self) -> &[u32] {
        &self.levels
    }

    /// Decode `paths` and sweep every decodable image.
    pub fn run_paths(&self, paths: &[PathBuf]) -> Result<BatchReport> {
        let mut sources = Vec::with_capacity(paths.len());
        let mut failed = Vec::new();
        for (path, id) in paths.iter().zip(unique_source_ids(paths)) {
            match Frame::open(path) {
                Ok(frame) => sources.push(Source { id, frame }),
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    failed.push(FailedItem {
                        source: id,
                        kind: None,
                        level: None,
                        error: e.to_string(),
                    });
                }
            }
        }

        let mut report = self.run(&sources)?;
        report.total_sources = paths.len();
        report.expected_variants = paths.len() * self.kinds.len() * self.levels.len();
        failed.append(&mut report.failed);
        report.failed = failed;
        if let Some(path) = self.report_path() {
            report.save_to_file(&path)?;
        }
        Ok(report)
    }

    /// Sweep already decoded sources.
    ///
    /// # Errors
    /// `InvalidConfig` when two sources share an identifier.
    pub fn run(&self, sources: &[Source]) -> Result<BatchReport> {
        check_unique_ids(sources)?;
        let seed = self.base_seed();
        std::fs::create_dir_all(&self.config.output_root)?;

        let tasks: Vec<(usize, DegradationKind)> = (0..sources.len())
            .flat_map(|i| self.kinds.iter().map(move |&kind| (i, kind)))
            .collect();
        let expected = tasks.len() * self.levels.len();
        info!(
            "Sweeping {} sources x {} kinds x {} levels ({} variants, seed {})",
            sources.len(),
            self.kinds.len(),
            self.levels.len(),
            expected,
            seed
        );

        let progress = self.progress_bar(expected as u64);
        let outcomes: Vec<SequenceOutcome> = self.install(|| {
            tasks
                .par_iter()
                .map(|&(index, kind)| {
                    self.run_sequence(&sources[index], index, kind, seed, &progress)
                })
                .collect()
        })?;
        progress.finish_with_message("Sweep complete");

        let written = outcomes.iter().map(|o| o.written).sum();
        let failed: Vec<FailedItem> = outcomes.into_iter().flat_map(|o| o.failed).collect();
        if !failed.is_empty() {
            warn!("{} items failed during the sweep", failed.len());
        }
        info!("Wrote {written} of {expected} variants");

        Ok(BatchReport {
            generated_at: Utc::now(),
            seed,
            total_sources: sources.len(),
            kinds: self.kinds.clone(),
            levels_per_source: self.levels.len(),
            expected_variants: expected,
            written_variants: written,
            failed,
        })
    }

    fn run_sequence(
        &self,
        source: &Source,
        source_index: usize,
        kind: DegradationKind,
        seed: u64,
        progress: &ProgressBar,
    ) -> SequenceOutcome {
        let dir = sequence_dir(&self.config.output_root, kind, &source.id);
        let mut outcome = SequenceOutcome {
            written: 0,
            failed: Vec::new(),
        };
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!("Cannot create {}: {}", dir.display(), e);
            outcome.failed.push(FailedItem {
                source: source.id.clone(),
                kind: Some(kind),
                level: None,
                error: e.to_string(),
            });
            progress.inc(self.levels.len() as u64);
            return outcome;
        }

        let mut records = Vec::with_capacity(self.levels.len());
        for &level in &self.levels {
            let mut rng = variant_rng(seed, source_index, kind, level);
            match self.write_variant(source, kind, level, &dir, &mut rng) {
                Ok(record) => {
                    outcome.written += 1;
                    records.push(record);
                }
                Err(e) => {
                    warn!("{} {} level {}: {}", source.id, kind, level, e);
                    outcome.failed.push(FailedItem {
                        source: source.id.clone(),
                        kind: Some(kind),
                        level: Some(level),
                        error: e.to_string(),
                    });
                }
            }
            progress.inc(1);
        }

        if self.config.write_manifests {
            let manifest = SequenceManifest {
                source: source.id.clone(),
                kind,
                max_level: self.engine.max_level(),
                seed,
                variants: records,
            };
            if let Err(e) = manifest.save_to_file(&dir.join(MANIFEST_FILE_NAME)) {
                warn!("Cannot write manifest for {} {}: {}", source.id, kind, e);
                outcome.failed.push(FailedItem {
                    source: source.id.clone(),
                    kind: Some(kind),
                    level: None,
                    error: e.to_string(),
                });
            }
        }
        outcome
    }

    fn write_variant(
        &self,
        source: &Source,
        kind: DegradationKind,
        level: u32,
        dir: &Path,
        rng: &mut dyn RngCore,
    ) -> Result<VariantRecord> {
        let variant = self.engine.apply_level(&source.frame, kind, level, rng)?;
        let output = self
            .config
            .naming
            .file_name(kind, level, &self.engine.level_scale())?;
        let image_path = dir.join(&output);
        variant.frame.save(&image_path)?;

        let record = VariantRecord {
            source: source.id.clone(),
            kind,
            level,
            parameters: variant.parameters,
            output,
            width: variant.frame.width(),
            height: variant.frame.height(),
        };
        record.save_to_file(&metadata_path(&image_path))?;
        Ok(record)
    }

    /// Render gradient sequences for procedurally drawn illusions.
    ///
    /// Frames land in `{output_root}/illusions/{name}/gradient_{i:03}.png`
    /// with a sibling parameter record each.
    pub fn generate_illusions(
        &self,
        illusions: &[Illusion],
        sequencer: &GradientSequencer,
        size: ImageSize,
    ) -> Result<BatchReport> {
        let seed = self.base_seed();
        let expected = illusions.len() * sequencer.total_steps() as usize;
        let progress = self.progress_bar(expected as u64);

        let outcomes: Vec<SequenceOutcome> = self.install(|| {
            illusions
                .par_iter()
                .enumerate()
                .map(|(index, &illusion)| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    rng.set_stream(index as u64);
                    let outcome = self.write_illusion(illusion, sequencer, size, &mut rng);
                    progress.inc(sequencer.total_steps() as u64);
                    outcome
                })
                .collect()
        })?;
        progress.finish_with_message("Illusions complete");

        Ok(BatchReport {
            generated_at: Utc::now(),
            seed,
            total_sources: illusions.len(),
            kinds: Vec::new(),
            levels_per_source: sequencer.total_steps() as usize,
            expected_variants: expected,
            written_variants: outcomes.iter().map(|o| o.written).sum(),
            failed: outcomes.into_iter().flat_map(|o| o.failed).collect(),
        })
    }

    fn write_illusion(
        &self,
        illusion: Illusion,
        sequencer: &GradientSequencer,
        size: ImageSize,
        rng: &mut ChaCha8Rng,
    ) -> SequenceOutcome {
        let failure = |error: String| FailedItem {
            source: illusion.name().to_string(),
            kind: None,
            level: None,
            error,
        };

        let dir = self
            .config
            .output_root
            .join("illusions")
            .join(illusion.name());
        let steps = match std::fs::create_dir_all(&dir)
            .map_err(|e| e.to_string())
            .and_then(|_| render_sequence(illusion, sequencer, size, rng).map_err(|e| e.to_string()))
        {
            Ok(steps) => steps,
            Err(e) => {
                warn!("Illusion {illusion} failed: {e}");
                return SequenceOutcome {
                    written: 0,
                    failed: vec![failure(e)],
                };
            }
        };

        let mut outcome = SequenceOutcome {
            written: 0,
            failed: Vec::new(),
        };
        for step in steps {
            let output = gradient_file_name(step.index);
            let image_path = dir.join(&output);
            let record = IllusionRecord {
                illusion: illusion.name().to_string(),
                index: step.index,
                total_steps: sequencer.total_steps(),
                params: step.params,
                output,
                width: step.frame.width(),
                height: step.frame.height(),
            };
            let written = step
                .frame
                .save(&image_path)
                .map_err(Into::into)
                .and_then(|_| write_json(&record, &metadata_path(&image_path)));
            match written {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    warn!("Illusion {} step {}: {}", illusion, step.index, e);
                    outcome.failed.push(FailedItem {
                        level: Some(step.index),
                        ..failure(e.to_string())
                    });
                }
            }
        }
        outcome
    }

    /// Render dichromacy severity gradients of every source.
    ///
    /// Each (source, deficiency) pair yields `num_steps + 1` frames with
    /// `severity = step / num_steps`, written to
    /// `{output_root}/severity/{kind}/{source}/{kind}_severity_{step:03}.png`.
    pub fn generate_severity_gradients(
        &self,
        sources: &[Source],
        deficiencies: &[Dichromacy],
        num_steps: u32,
    ) -> Result<BatchReport> {
        check_unique_ids(sources)?;
        let frames_per_pair = num_steps as usize + 1;
        let tasks: Vec<(&Source, Dichromacy)> = sources
            .iter()
            .flat_map(|source| deficiencies.iter().map(move |&d| (source, d)))
            .collect();
        let expected = tasks.len() * frames_per_pair;
        let progress = self.progress_bar(expected as u64);

        let outcomes: Vec<SequenceOutcome> = self.install(|| {
            tasks
                .par_iter()
                .map(|&(source, deficiency)| {
                    let outcome = self.write_severity_gradient(source, deficiency, num_steps);
                    progress.inc(frames_per_pair as u64);
                    outcome
                })
                .collect()
        })?;
        progress.finish_with_message("Severity gradients complete");

        let report = BatchReport {
            generated_at: Utc::now(),
            seed: self.base_seed(),
            total_sources: sources.len(),
            kinds: deficiencies.iter().map(|d| d.kind()).collect(),
            levels_per_source: frames_per_pair,
            expected_variants: expected,
            written_variants: outcomes.iter().map(|o| o.written).sum(),
            failed: outcomes.into_iter().flat_map(|o| o.failed).collect(),
        };
        info!(
            "Severity gradients: {}/{} frames written",
            report.written_variants, report.expected_variants
        );
        Ok(report)
    }

    fn write_severity_gradient(
        &self,
        source: &Source,
        deficiency: Dichromacy,
        num_steps: u32,
    ) -> SequenceOutcome {
        let kind = deficiency.kind();
        let improved = self.config.engine.improved_color_matrices;
        let failure = |level: Option<u32>, error: String| FailedItem {
            source: source.id.clone(),
            kind: Some(kind),
            level,
            error,
        };

        let dir = self
            .config
            .output_root
            .join("severity")
            .join(kind.as_str())
            .join(&source.id);
        let steps = match std::fs::create_dir_all(&dir)
            .map_err(|e| e.to_string())
            .and_then(|_| {
                severity_gradient(&source.frame, deficiency, num_steps, improved)
                    .map_err(|e| e.to_string())
            }) {
            Ok(steps) => steps,
            Err(e) => {
                warn!("Severity gradient {} for {} failed: {}", kind, source.id, e);
                return SequenceOutcome {
                    written: 0,
                    failed: vec![failure(None, e)],
                };
            }
        };

        let mut outcome = SequenceOutcome {
            written: 0,
            failed: Vec::new(),
        };
        for step in steps {
            let output = severity_step_file_name(kind, step.step);
            let image_path = dir.join(&output);
            let record = SeverityRecord {
                source: source.id.clone(),
                kind,
                step: step.step,
                num_steps,
                severity: step.severity,
                improved,
                output,
                width: step.frame.width(),
                height: step.frame.height(),
            };
            let written = step
                .frame
                .save(&image_path)
                .map_err(Into::into)
                .and_then(|_| write_json(&record, &metadata_path(&image_path)));
            match written {
                Ok(()) => outcome.written += 1,
                Err(e) => {
                    warn!("{} for {} step {}: {}", kind, source.id, step.step, e);
                    outcome.failed.push(failure(Some(step.step), e.to_string()));
                }
            }
        }
        outcome
    }

    fn base_seed(&self) -> u64 {
        self.config
            .engine
            .seed
            .unwrap_or_else(|| rand::rng().next_u64())
    }

    fn report_path(&self) -> Option<PathBuf> {
        self.config
            .write_manifests
            .then(|| self.config.output_root.join("batch_report.json"))
    }

    fn progress_bar(&self, total: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        match ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} ({eta})") {
            Ok(style) => bar.set_style(style.progress_chars("█▉▊▋▌▍▎▏ ")),
            Err(e) => warn!("Progress template rejected: {e}"),
        }
        bar.set_message("Generating variants");
        bar
    }

    /// Run `op` on the configured pool, or the global one.
    fn install<T, F>(&self, op: F) -> Result<T>
    where
        T: Send,
        F: FnOnce() -> T + Send,
    {
        match self.config.threads {
            Some(threads) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()?;
                Ok(pool.install(op))
            }
            None => Ok(op()),
        }
    }
}

fn check_unique_ids(sources: &[Source]) -> Result<()> {
    let mut seen = HashSet::with_capacity(sources.len());
    for source in sources {
        if !seen.insert(source.id.as_str()) {
            return Err(SweepError::InvalidConfig(format!(
                "source id '{}' appears more than once",
                source.id
            )));
        }
    }
    Ok(())
}

/// Independent random stream for one variant.
///
/// Levels occupy the low 24 bits of the stream id, which `LevelScale`
/// guarantees by capping the top level at `MAX_LEVEL_LIMIT`.
pub fn variant_rng(seed: u64, source_index: usize, kind: DegradationKind, level: u32) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(((source_index as u64) << 32) | ((kind.index() as u64) << 24) | level as u64);
    rng
}

#[cfg(test)]
mod tests {
    use super::*;
    use degrade::EngineConfig;
    use tempfile::tempdir;

    fn source(id: &str) -> Source {
        Source {
            id: id.to_string(),
            frame: Frame::filled(ImageSize::from_width_height(24, 16), [90, 140, 200]).unwrap(),
        }
    }

    fn config(root: &Path, kinds: &[&str], levels: &[u32]) -> SweepConfig {
        SweepConfig {
            output_root: root.to_path_buf(),
            kinds: kinds.iter().map(|k| k.to_string()).collect(),
            levels: Some(levels.to_vec()),
            threads: Some(2),
            engine: EngineConfig {
                seed: Some(17),
                ..EngineConfig::default()
            },
            ..SweepConfig::default()
        }
    }

    #[test]
    fn test_variant_streams_are_distinct() {
        let mut a = variant_rng(1, 0, DegradationKind::GaussianNoise, 10);
        let mut b = variant_rng(1, 0, DegradationKind::GaussianNoise, 11);
        let mut c = variant_rng(1, 1, DegradationKind::GaussianNoise, 10);
        let mut again = variant_rng(1, 0, DegradationKind::GaussianNoise, 10);
        let first = a.next_u64();
        assert_ne!(first, b.next_u64());
        assert_ne!(first, c.next_u64());
        assert_eq!(first, again.next_u64());

        let top = degrade::level::MAX_LEVEL_LIMIT;
        let mut last_level = variant_rng(1, 0, DegradationKind::Tritanopia, top);
        let mut next_kind = variant_rng(1, 0, DegradationKind::GaussianNoise, 0);
        assert_ne!(last_level.next_u64(), next_kind.next_u64());
    }

    #[test]
    fn test_level_scale_beyond_stream_bits_is_rejected() {
        let dir = tempdir().unwrap();
        let mut config = config(dir.path(), &["blur"], &[0]);
        config.engine.max_level = degrade::level::MAX_LEVEL_LIMIT + 1;
        assert!(BatchOrchestrator::new(config).is_err());
    }

    #[test]
    fn test_unknown_kind_fails_before_running() {
        let dir = tempdir().unwrap();
        let result = BatchOrchestrator::new(config(dir.path(), &["blur", "posterize"], &[0]));
        assert!(result.is_err());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn test_run_writes_every_variant_with_metadata() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let orchestrator =
            BatchOrchestrator::new(config(dir.path(), &["brightness", "salt_pepper_noise"], &[0, 50, 100]))
                .unwrap();
        let report = orchestrator.run(&[source("a"), source("b")]).unwrap();

        assert_eq!(report.expected_variants, 12);
        assert_eq!(report.written_variants, 12);
        assert!(report.failed.is_empty());
        assert_eq!(report.seed, 17);

        let seq = dir.path().join("brightness").join("a");
        for level in [0, 50, 100] {
            assert!(seq.join(format!("brightness_{level:03}.png")).exists());
            assert!(seq.join(format!("brightness_{level:03}.json")).exists());
        }
        let manifest = SequenceManifest::load_from_file(&seq.join(MANIFEST_FILE_NAME)).unwrap();
        assert_eq!(manifest.variants.len(), 3);
        assert_eq!(manifest.variants[2].level, 100);

        let untouched = Frame::open(seq.join("brightness_000.png")).unwrap();
        assert_eq!(untouched, source("a").frame);
    }

    #[test]
    fn test_illusion_sequences_are_written() {
        let dir = tempdir().unwrap();
        let orchestrator = BatchOrchestrator::new(config(dir.path(), &["blur"], &[0])).unwrap();
        let sequencer =
            GradientSequencer::new(4, degrade::InterpolationPolicy::Banded).unwrap();
        let report = orchestrator
            .generate_illusions(
                &[Illusion::CheckerShadow, Illusion::WhiteIllusion],
                &sequencer,
                ImageSize::from_width_height(64, 64),
            )
            .unwrap();
        assert_eq!(report.written_variants, 8);
        let dir = dir.path().join("illusions").join(Illusion::WhiteIllusion.name());
        assert!(dir.join("gradient_003.png").exists());
        assert!(dir.join("gradient_003.json").exists());
    }

    #[test]
    fn test_severity_gradients_are_written_per_deficiency() {
        let dir = tempdir().unwrap();
        let orchestrator = BatchOrchestrator::new(config(dir.path(), &["blur"], &[0])).unwrap();
        let source = Source {
            id: "red".to_string(),
            frame: Frame::filled(ImageSize::from_width_height(8, 8), [255, 0, 0]).unwrap(),
        };
        let report = orchestrator
            .generate_severity_gradients(
                &[source.clone()],
                &[Dichromacy::Protanopia, Dichromacy::Tritanopia],
                4,
            )
            .unwrap();
        assert_eq!(report.expected_variants, 10);
        assert_eq!(report.written_variants, 10);
        assert_eq!(report.seed, 17);
        assert!(report.failed.is_empty());

        let seq = dir.path().join("severity").join("protanopia").join("red");
        let first = Frame::open(seq.join("protanopia_severity_000.png")).unwrap();
        assert_eq!(first, source.frame);
        let record: SeverityRecord =
            crate::record::read_json(&seq.join("protanopia_severity_004.json")).unwrap();
        assert_eq!(record.step, 4);
        assert_eq!(record.severity, 1.0);
    }

    #[test]
    fn test_duplicate_source_ids_are_rejected() {
        let dir = tempdir().unwrap();
        let orchestrator = BatchOrchestrator::new(config(dir.path(), &["blur"], &[0])).unwrap();
        let result = orchestrator.run(&[source("cat"), source("cat")]);
        assert!(matches!(result, Err(SweepError::InvalidConfig(_))));
        assert!(!dir.path().join("blur").exists());
    }
}
