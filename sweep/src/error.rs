use std::path::PathBuf;

use degrade::DegradeError;
use thiserror::Error;

/// Errors raised while running or evaluating a batch.
#[derive(Error, Debug)]
pub enum SweepError {
    #[error("Degradation error: {0}")]
    Degrade(#[from] DegradeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Comparator failed on {path}: {message}")]
    Comparator { path: PathBuf, message: String },

    #[error("Invalid sweep configuration: {0}")]
    InvalidConfig(String),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SweepError>;
