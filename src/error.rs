//! Ambient error type for the pipeline's I/O boundary.
//!
//! Every error kind the core resolution/matching algorithms can hit (§7 of
//! the design) is recovered locally and never surfaces here — `RadarError`
//! only covers the things that happen before the core ever runs: reading
//! the required input files and writing the outputs.

use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RadarError {
    /// A required input file does not exist or could not be read.
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: io::Error },

    /// A required input file exists but is not valid JSON, or its
    /// top-level shape doesn't match the documented contract.
    #[error("invalid JSON in {path}: {message}")]
    InvalidInput { path: PathBuf, message: String },

    /// A `PipelineConfig` field failed validation (e.g. an empty required
    /// path).
    #[error("invalid pipeline configuration: {0}")]
    InvalidConfig(String),

    /// Parsing the TOML config source itself failed.
    #[error("failed to parse pipeline config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, RadarError>;
