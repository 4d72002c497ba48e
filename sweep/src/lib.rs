//! Batch generation and evaluation of degradation sweeps.
//!
//! The [`BatchOrchestrator`] runs the degradation engine over every
//! (source, kind, level) triple of a batch in parallel and persists each
//! variant as a PNG with a sibling JSON record. Output is laid out as
//!
//! ```text
//! {output_root}/
//!   batch_report.json
//!   {kind}/{source}/
//!     manifest.json
//!     {kind}_{level:03}.png
//!     {kind}_{level:03}.json
//!   severity/{kind}/{source}/
//!     {kind}_severity_{step:03}.png
//!     {kind}_severity_{step:03}.json
//!   illusions/{name}/
//!     gradient_{index:03}.png
//!     gradient_{index:03}.json
//! ```
//!
//! The [`Evaluator`] walks the manifests with a caller-supplied comparator
//! and reports failure thresholds and aggregate statistics.

pub mod config;
pub mod error;
pub mod evaluate;
pub mod naming;
pub mod orchestrator;
pub mod record;

pub use config::SweepConfig;
pub use error::{Result, SweepError};
pub use evaluate::{find_manifests, EvaluationSummary, Evaluator, KindSummary, SequenceEvaluation};
pub use naming::NamingStyle;
pub use orchestrator::{BatchOrchestrator, Source};
pub use record::{
    BatchReport, FailedItem, IllusionRecord, SequenceManifest, SeverityRecord,
    VariantRecord,
};
