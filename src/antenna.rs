//! Far-field gain and input impedance estimators.
//!
//! Neither function guards its inputs: a zero distance, a negative linear
//! gain or a reflection coefficient of exactly one produce NaN or infinite
//! results, which are the physically degenerate answers.

use std::f64::consts::PI;

use num::complex::Complex;

/// Speed of light used for the lab measurements, m/s.
pub const SPEED_OF_LIGHT: f64 = 3e8;

/// Default reference impedance, ohms.
pub const DEFAULT_Z0: f64 = 50.;

/// Estimates the gain of a receiving antenna from the transmission
/// coefficient between it and a transmitter of known gain.
///
/// `tx_gain` is in dB unless `linear_gain` is set. The result is always a
/// linear power ratio; use [`to_db`] for dBi.
pub fn rx_gain_from_s21(s21: f64, w: f64, tx_gain: f64, r: f64, c: f64, linear_gain: bool) -> f64 {
    let tx_gain = if linear_gain { tx_gain } else { from_db(tx_gain) };
    (8. * PI.powi(2) * s21.abs() * w * r / c).powi(2) / tx_gain
}

/// Input impedance seen through a reflection coefficient `gamma`
/// referenced to `z0`.
pub fn impedance_from_reflection(gamma: Complex<f64>, z0: f64) -> Complex<f64> {
    (Complex::new(1., 0.) + gamma) / (Complex::new(1., 0.) - gamma) * z0
}

/// Power ratio to decibels.
pub fn to_db(linear: f64) -> f64 {
    10. * linear.log10()
}

/// Decibels to power ratio.
pub fn from_db(db: f64) -> f64 {
    10f64.powf(db / 10.)
}
