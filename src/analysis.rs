//! Per-angle measurement analysis.
//!
//! Each S2P file in the data folder holds one two-port measurement taken
//! with the receiving antenna rotated to the angle named by the file stem.
//! Every file becomes an [`AngleResult`]; the collection drives the
//! broadside S-parameter plot and the polar emission pattern.

use std::f64::consts::PI;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use num::complex::Complex;
use tracing::{debug, info, warn};

use crate::antenna::{impedance_from_reflection, rx_gain_from_s21, to_db};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, AnalysisResult};
use crate::frequency::Frequency;
use crate::network::Network;
use crate::plot;

/// Label of the measurement taken facing the transmitter.
pub const BROADSIDE_LABEL: &str = "0";

/// Lists the measurement files of a data folder. A file qualifies when its
/// extension contains `S2P` (case-sensitive). Sorted by path.
pub fn discover_measurements(dir: &Path) -> AnalysisResult<Vec<PathBuf>> {
    let mut files = vec![];
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_measurement = path
            .extension()
            .map_or(false, |ext| ext.to_string_lossy().contains("S2P"));
        if is_measurement && path.is_file() {
            files.push(path);
        }
    }
    Ok(files.into_iter().sorted().collect())
}

/// Angle in degrees encoded in a measurement label such as `-30`.
pub fn parse_angle_label(label: &str) -> AnalysisResult<f64> {
    match label.trim().parse::<f64>() {
        Ok(angle) if angle.is_finite() => Ok(angle),
        _ => Err(AnalysisError::InvalidAngle(label.to_owned())),
    }
}

/// The value handed to the gain estimator as `w` for a bin at `freq` Hz.
///
/// Dividing by 2π keeps `8π²·w` equal to `4π·f`, the Friis free-space term.
pub fn estimator_frequency(freq: f64) -> f64 {
    freq / (2. * PI)
}

/// Analysis of one angle's measurement.
#[derive(Debug, Clone)]
pub struct AngleResult {
    pub label: String,
    pub angle_deg: f64,
    pub frequency: Frequency,
    pub s11: Vec<f64>,
    pub s12: Vec<f64>,
    pub s21: Vec<f64>,
    pub s22: Vec<f64>,
    /// Receiver gain per bin, dBi or linear per the configuration
    pub gain: Vec<f64>,
    pub max_gain: f64,
    /// Bin of `max_gain`
    pub max_index: usize,
    /// Input impedance from `|S22|` at `max_index`
    pub impedance: Complex<f64>,
    /// Input impedance from the complex S22 at `max_index`
    pub complex_impedance: Complex<f64>,
    pub linear_gain: bool,
}

impl AngleResult {
    pub fn from_network(network: &Network, config: &AnalysisConfig) -> AnalysisResult<Self> {
        let label = network.name().to_owned();
        let angle_deg = parse_angle_label(&label)?;
        if network.nports() != 2 {
            return Err(AnalysisError::NotTwoPort {
                label,
                nports: network.nports(),
            });
        }
        if network.nfreq() == 0 {
            return Err(AnalysisError::EmptySweep(label));
        }

        let s21 = network.s21();
        let s22 = network.s22();
        let gain: Vec<f64> = network
            .frequency()
            .f()
            .iter()
            .zip(s21.iter())
            .map(|(&freq, s21)| {
                let gain = rx_gain_from_s21(
                    s21.norm(),
                    estimator_frequency(freq),
                    config.tx_gain_db,
                    config.antenna_distance,
                    config.speed_of_light,
                    config.linear_gain,
                );
                if config.linear_gain {
                    gain
                } else {
                    to_db(gain)
                }
            })
            .collect();

        // First maximum wins; NaN bins are skipped
        let (max_index, max_gain) = gain
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, g)| !g.is_nan())
            .fold(None, |best: Option<(usize, f64)>, (i, g)| match best {
                Some((_, b)) if b >= g => best,
                _ => Some((i, g)),
            })
            .unwrap_or((0, f64::NAN));
        if !max_gain.is_finite() {
            warn!(angle = %label, max_gain, "maximum gain is not finite");
        }
        let gamma = s22[max_index];
        let impedance = impedance_from_reflection(Complex::new(gamma.norm(), 0.), config.reference_impedance);
        let complex_impedance = impedance_from_reflection(gamma, config.reference_impedance);

        Ok(AngleResult {
            label,
            angle_deg,
            frequency: network.frequency().clone(),
            s11: network.s_mag(0, 0).to_vec(),
            s12: network.s_mag(0, 1).to_vec(),
            s21: s21.iter().map(|v| v.norm()).collect(),
            s22: s22.iter().map(|v| v.norm()).collect(),
            gain,
            max_gain,
            max_index,
            impedance,
            complex_impedance,
            linear_gain: config.linear_gain,
        })
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_deg.to_radians()
    }
}

impl fmt::Display for AngleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Statistics for Angle {}", self.label)?;
        if self.linear_gain {
            writeln!(f, "  Max Gain for Angle in Linear Units: {}", self.max_gain)?;
        } else {
            writeln!(f, "  Max Gain for Angle in dBi: {}", self.max_gain)?;
        }
        write!(f, "  Impedance: {}", self.impedance)
    }
}

/// Wide view of all results: a `Frequency` column followed by
/// `<angle>_s11`, `<angle>_s21`, `<angle>_s12`, `<angle>_s22` and
/// `<angle>_gain` for each angle in processing order.
#[derive(Debug, Clone, Default)]
pub struct AggregatedTable {
    columns: Vec<(String, Vec<f64>)>,
}

impl AggregatedTable {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, |(_, values)| values.len())
    }
}

/// Results of every analysed angle, in processing order.
#[derive(Debug, Clone)]
pub struct Analysis {
    config: AnalysisConfig,
    results: Vec<AngleResult>,
}

impl Analysis {
    pub fn new(config: AnalysisConfig) -> Self {
        Analysis {
            config,
            results: vec![],
        }
    }

    /// Loads and analyses every measurement in the configured data folder,
    /// printing per-angle statistics as it goes. Stops at the first error.
    pub fn run(config: &AnalysisConfig) -> AnalysisResult<Self> {
        let files = discover_measurements(&config.data_folder)?;
        if files.is_empty() {
            return Err(AnalysisError::NoMeasurements(config.data_folder.clone()));
        }
        info!(count = files.len(), folder = %config.data_folder.display(), "found measurement files");
        println!("{:?}", files.iter().map(|p| p.display().to_string()).collect::<Vec<_>>());

        let mut analysis = Analysis::new(config.clone());
        for path in files {
            println!("Analyzing {}", path.display());
            let network = Network::from_touchstone(&path).map_err(|source| AnalysisError::Parse {
                path: path.clone(),
                source,
            })?;
            let result = analysis.push(&network)?;
            println!("{}", result);
            println!();
        }
        Ok(analysis)
    }

    /// Analyses already-loaded networks, named by angle label.
    pub fn from_networks<'a, I>(config: AnalysisConfig, networks: I) -> AnalysisResult<Self>
    where
        I: IntoIterator<Item = &'a Network>,
    {
        let mut analysis = Analysis::new(config);
        for network in networks {
            analysis.push(network)?;
        }
        Ok(analysis)
    }

    /// Adds one measurement. Its sweep must match the first measurement's.
    pub fn push(&mut self, network: &Network) -> AnalysisResult<&AngleResult> {
        if let Some(first) = self.results.first() {
            if !network
                .frequency()
                .matches(&first.frequency, self.config.sweep_tolerance)
            {
                return Err(AnalysisError::SweepMismatch {
                    angle: network.name().to_owned(),
                    reference: first.label.clone(),
                });
            }
        }
        let result = AngleResult::from_network(network, &self.config)?;
        debug!(
            angle = result.angle_deg,
            max_gain = result.max_gain,
            max_index = result.max_index,
            "analysed measurement"
        );
        self.results.push(result);
        Ok(&self.results[self.results.len() - 1])
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn results(&self) -> &[AngleResult] {
        &self.results
    }

    pub fn table(&self) -> AggregatedTable {
        let mut columns = vec![];
        let frequency = self
            .results
            .first()
            .map(|r| r.frequency.f().to_vec())
            .unwrap_or_default();
        columns.push(("Frequency".to_owned(), frequency));
        for result in &self.results {
            let label = &result.label;
            columns.push((format!("{}_s11", label), result.s11.clone()));
            columns.push((format!("{}_s21", label), result.s21.clone()));
            columns.push((format!("{}_s12", label), result.s12.clone()));
            columns.push((format!("{}_s22", label), result.s22.clone()));
            columns.push((format!("{}_gain", label), result.gain.clone()));
        }
        AggregatedTable { columns }
    }

    /// The measurement labelled `0`, assumed to face the transmitter.
    pub fn broadside(&self) -> AnalysisResult<&AngleResult> {
        self.results
            .iter()
            .find(|r| r.label == BROADSIDE_LABEL)
            .ok_or_else(|| AnalysisError::MissingBroadside(BROADSIDE_LABEL.to_owned()))
    }

    /// `(angle in radians, max gain)` per measurement, ascending by angle,
    /// with the first point repeated at the end to close the polar trace.
    pub fn emission_pattern(&self) -> Vec<(f64, f64)> {
        let mut points: Vec<(f64, f64)> = self
            .results
            .iter()
            .map(|r| (r.angle_rad(), r.max_gain))
            .sorted_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)))
            .collect();
        if let Some(&first) = points.first() {
            points.push(first);
        }
        points
    }

    /// Writes the broadside S-parameter plot and then the emission pattern.
    /// A missing broadside measurement aborts before anything is written.
    pub fn report(&self) -> AnalysisResult<(PathBuf, PathBuf)> {
        let broadside = self.broadside()?;
        fs::create_dir_all(&self.config.output_dir)?;
        let antenna = self.config.folder_label();

        let broadside_path = self.config.broadside_path();
        plot::broadside_sparams(&broadside_path, &antenna, broadside, self.config.image_format)?;
        info!(path = %broadside_path.display(), "saved broadside S-parameter plot");

        let emissions_path = self.config.emissions_path();
        plot::emission_pattern(
            &emissions_path,
            &antenna,
            &self.emission_pattern(),
            self.config.linear_gain,
            self.config.image_format,
        )?;
        info!(path = %emissions_path.display(), "saved emission pattern plot");

        Ok((broadside_path, emissions_path))
    }
}
