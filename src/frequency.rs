use std::fmt;
use std::ops::Mul;
use std::str::FromStr;

use ndarray::prelude::*;

use crate::error::ParseError;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FreqUnit {
    Hz,
    KHz,
    MHz,
    GHz,
    THz,
}

impl FreqUnit {
    /// Number of hertz in one of this unit.
    pub fn multiplier(self) -> f64 {
        use FreqUnit::*;
        match self {
            Hz => 1.,
            KHz => 1e3,
            MHz => 1e6,
            GHz => 1e9,
            THz => 1e12,
        }
    }
}

impl FromStr for FreqUnit {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use FreqUnit::*;
        match s.to_ascii_lowercase().as_str() {
            "hz" => Ok(Hz),
            "khz" => Ok(KHz),
            "mhz" => Ok(MHz),
            "ghz" => Ok(GHz),
            "thz" => Ok(THz),
            _ => Err(ParseError::InvalidOption(format!("unknown frequency unit {:?}", s))),
        }
    }
}

impl fmt::Display for FreqUnit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use FreqUnit::*;
        let name = match self {
            Hz => "Hz",
            KHz => "kHz",
            MHz => "MHz",
            GHz => "GHz",
            THz => "THz",
        };
        f.write_str(name)
    }
}

impl Mul<f64> for FreqUnit {
    type Output = f64;

    fn mul(self, rhs: f64) -> f64 {
        self.multiplier() * rhs
    }
}

/// Represents a frequency band, stored in Hz
#[derive(PartialEq, Debug, Clone)]
pub struct Frequency {
    f: Array1<f64>,
    start: f64,
    stop: f64,
    npoints: usize,
}

impl From<Vec<f64>> for Frequency {
    fn from(freqs: Vec<f64>) -> Self {
        let start = freqs.first().copied().unwrap_or(0.);
        let stop = freqs.last().copied().unwrap_or(0.);
        let npoints = freqs.len();
        Frequency {
            f: Array::from_vec(freqs),
            start,
            stop,
            npoints,
        }
    }
}

impl Frequency {
    pub fn new(start: f64, stop: f64, npoints: Option<usize>, unit: Option<FreqUnit>) -> Self {
        let n = npoints.unwrap_or(0);
        let unit = unit.unwrap_or(FreqUnit::Hz);
        let f = Array::linspace(unit * start, unit * stop, n);
        Frequency {
            f,
            start: unit * start,
            stop: unit * stop,
            npoints: n,
        }
    }

    pub fn f(&self) -> &Array1<f64> {
        &self.f
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn stop(&self) -> f64 {
        self.stop
    }

    pub fn len(&self) -> usize {
        self.npoints
    }

    pub fn is_empty(&self) -> bool {
        self.npoints == 0
    }

    /// True when both sweeps have the same number of points and every bin
    /// agrees within `rel_tol` (relative to the larger magnitude).
    pub fn matches(&self, other: &Frequency, rel_tol: f64) -> bool {
        self.npoints == other.npoints
            && self.f.iter().zip(other.f.iter()).all(|(&a, &b)| {
                let scale = a.abs().max(b.abs());
                (a - b).abs() <= rel_tol * scale
            })
    }
}
