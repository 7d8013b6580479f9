//! Antenna far-field gain and input impedance from two-port S-parameter
//! measurements.
//!
//! A data folder holds one Touchstone S2P file per receiver angle. Each is
//! read into a [`Network`], reduced to an [`AngleResult`] and collected in an
//! [`Analysis`], which renders the broadside S-parameter plot and the polar
//! emission pattern.

pub mod analysis;
pub mod antenna;
pub mod config;
pub mod error;
pub mod frequency;
pub mod network;
pub mod plot;
pub mod touchstone;

use ndarray::prelude::{Array2, Array3};
use num::complex::Complex;

pub use analysis::{AggregatedTable, Analysis, AngleResult};
pub use config::{AnalysisConfig, ImageFormat};
pub use error::{AnalysisError, ParseError};
pub use network::Network;

pub type CxArray2 = Array2<Complex<f64>>;
pub type CxArray3 = Array3<Complex<f64>>;
