use std::path::Path;

use ndarray::prelude::*;
use num::complex::Complex;
use tracing::debug;

use crate::error::ParseError;
use crate::frequency::Frequency;
use crate::touchstone::{ParamType, Touchstone};
use crate::{CxArray2, CxArray3};

/// An N-port network: S-matrix per frequency bin plus port impedances.
#[derive(Debug, PartialEq, Clone)]
pub struct Network {
    name: String,
    f: Frequency,
    /// Indexed as (frequency, row, column)
    s: CxArray3,
    /// Indexed as (frequency, port)
    z0: CxArray2,
}

impl Network {
    pub fn new(name: impl Into<String>, f: Frequency, s: CxArray3, z0: CxArray2) -> Self {
        Network {
            name: name.into(),
            f,
            s,
            z0,
        }
    }

    /// Loads an S-parameter network from a Touchstone file. The file stem
    /// becomes the network name.
    pub fn from_touchstone(file: &Path) -> Result<Self, ParseError> {
        let touchstone = Touchstone::new(file)?;
        if touchstone.options().param_type != ParamType::S {
            return Err(ParseError::Unsupported(format!(
                "{:?} parameters (only S parameters are read)",
                touchstone.options().param_type
            )));
        }
        let name = file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let nfreq = touchstone.freqs().len();
        debug!(
            file = touchstone.filename(),
            ports = touchstone.rank(),
            points = nfreq,
            "loaded touchstone network"
        );
        let reference = touchstone.reference_impedances();
        let z0 = Array::from_shape_fn((nfreq, touchstone.rank()), |(_, port)| {
            Complex::new(reference[port], 0.)
        });
        Ok(Network {
            name,
            f: Frequency::from(touchstone.freqs()),
            s: touchstone.s_params(),
            z0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn frequency(&self) -> &Frequency {
        &self.f
    }

    pub fn s(&self) -> &CxArray3 {
        &self.s
    }

    pub fn z0(&self) -> &CxArray2 {
        &self.z0
    }

    pub fn nports(&self) -> usize {
        self.s.dim().1
    }

    pub fn nfreq(&self) -> usize {
        self.s.dim().0
    }

    /// `S[i][j]` across the sweep, zero-based port indices.
    pub fn s_param(&self, i: usize, j: usize) -> Array1<Complex<f64>> {
        self.s.slice(s![.., i, j]).to_owned()
    }

    /// `|S[i][j]|` across the sweep.
    pub fn s_mag(&self, i: usize, j: usize) -> Array1<f64> {
        self.s.slice(s![.., i, j]).mapv(|v| v.norm())
    }

    pub fn s11(&self) -> Array1<Complex<f64>> {
        self.s_param(0, 0)
    }

    pub fn s12(&self) -> Array1<Complex<f64>> {
        self.s_param(0, 1)
    }

    pub fn s21(&self) -> Array1<Complex<f64>> {
        self.s_param(1, 0)
    }

    pub fn s22(&self) -> Array1<Complex<f64>> {
        self.s_param(1, 1)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::frequency::{FreqUnit, Frequency};

    #[test]
    fn test_instantiation() {
        let freq = Frequency::new(1., 3., Some(3), Some(FreqUnit::GHz));
        let one_c = Complex::new(1., 0.);
        let s = Array::from_elem((3, 1, 1), one_c);
        let z0 = Array::from_elem((3, 1), one_c);
        let net = Network::new("dut", freq, s, z0);
        assert_eq!(net.nports(), 1);
        assert_eq!(net.nfreq(), 3);
        assert_eq!(net.name(), "dut");
    }

    #[test]
    fn test_from_touchstone() {
        let path = Path::new("tests/data/ntwk_arbitrary_frequency.s2p");
        let net = Network::from_touchstone(path).unwrap();
        assert_eq!(net.name(), "ntwk_arbitrary_frequency");
        assert_eq!(net.nports(), 2);
        assert_eq!(net.frequency().f().to_vec(), vec![1., 4., 10., 20.]);
        assert_eq!(net.s22()[3], Complex::new(0.00741732005, -0.155084364));
        assert_eq!(net.s21()[0], Complex::new(0.926746562, -0.170089428));
        assert!((net.s_mag(0, 0)[0] - net.s11()[0].norm()).abs() < 1e-15);
        assert_eq!(net.z0()[[0, 1]], Complex::new(50., 0.));
    }
}
