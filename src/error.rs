//! Error types for Touchstone parsing and measurement analysis.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading a Touchstone file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("failed to read touchstone file: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported file extension: {0:?}")]
    UnsupportedExtension(String),

    #[error("invalid option line: {0}")]
    InvalidOption(String),

    #[error("line {line}: invalid number {token:?}")]
    InvalidNumber { line: usize, token: String },

    #[error("line {line}: invalid value for keyword [{keyword}]")]
    InvalidKeyword { line: usize, keyword: String },

    #[error("unsupported touchstone feature: {0}")]
    Unsupported(String),

    #[error("data shape mismatch: expected {expected} values, found {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("number of ports could not be determined")]
    MissingPorts,
}

/// Errors raised by the measurement analysis driver.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to load {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },

    #[error("file name {0:?} is not a numeric angle in degrees")]
    InvalidAngle(String),

    #[error("no S2P measurement files found in {0}")]
    NoMeasurements(PathBuf),

    #[error("measurement {label} is a {nports}-port network, expected 2 ports")]
    NotTwoPort { label: String, nports: usize },

    #[error("measurement {0} contains no frequency points")]
    EmptySweep(String),

    #[error("frequency sweep of angle {angle} does not match the sweep of angle {reference}")]
    SweepMismatch { angle: String, reference: String },

    #[error("no measurement labelled {0:?} available for the broadside plot")]
    MissingBroadside(String),

    #[error("plotting failed: {0}")]
    Plot(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
