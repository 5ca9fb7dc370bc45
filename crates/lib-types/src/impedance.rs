//! Complex impedance and the derived electrical parameter family.
//!
//! A single compensated impedance Z = R + jX at angular frequency omega
//! expands into the full LCR parameter set: admittance, series/parallel
//! resistance and reactance, capacitance, inductance, quality and
//! dissipation factors. Every derivation is a direct algebraic transform;
//! division by a legitimately-zero component (a pure resistor has X_s = 0)
//! produces a non-finite value which is surfaced as-is, never clamped.

use crate::units::Hertz;
use num_complex::Complex64;
use serde::Serialize;

/// The fifteen derived quantities reported for one compensated impedance,
/// in the instrument's output column order.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct DerivedParameters {
    /// Impedance phase [deg].
    pub phase_z_deg: f64,
    /// Impedance magnitude [Ohm].
    pub amplitude_z: f64,
    /// Admittance magnitude [S].
    pub y_abs: f64,
    /// Admittance phase [deg] (negative of the impedance phase).
    pub phase_y_deg: f64,
    /// Series resistance Re(Z) [Ohm].
    pub r_s: f64,
    /// Series reactance Im(Z) [Ohm].
    pub x_s: f64,
    /// Parallel conductance Re(Y) [S].
    pub g_p: f64,
    /// Parallel susceptance Im(Y) [S].
    pub b_p: f64,
    /// Series capacitance [F].
    pub c_s: f64,
    /// Parallel capacitance [F].
    pub c_p: f64,
    /// Series inductance [H].
    pub l_s: f64,
    /// Parallel inductance [H].
    pub l_p: f64,
    /// Parallel resistance [Ohm].
    pub r_p: f64,
    /// Quality factor X_s / R_s.
    pub q: f64,
    /// Dissipation factor -1/Q.
    pub d: f64,
}

impl DerivedParameters {
    /// Expand a compensated impedance at angular frequency `omega` [rad/s].
    pub fn from_impedance(z: Complex64, omega: f64) -> Self {
        let r_s = z.re;
        let x_s = z.im;
        let phase_z_deg = z.arg().to_degrees();
        let amplitude_z = z.norm();

        let y = z.inv();
        let g_p = y.re;
        let b_p = y.im;

        let q = x_s / r_s;

        Self {
            phase_z_deg,
            amplitude_z,
            y_abs: y.norm(),
            phase_y_deg: -phase_z_deg,
            r_s,
            x_s,
            g_p,
            b_p,
            c_s: -1.0 / (omega * x_s),
            c_p: b_p / omega,
            l_s: x_s / omega,
            l_p: -1.0 / (omega * b_p),
            r_p: 1.0 / g_p,
            q,
            d: -1.0 / q,
        }
    }

    /// True when every derived field is finite. Sweeps through resonance
    /// legitimately report rows where this is false.
    pub fn all_finite(&self) -> bool {
        [
            self.phase_z_deg,
            self.amplitude_z,
            self.y_abs,
            self.phase_y_deg,
            self.r_s,
            self.x_s,
            self.g_p,
            self.b_p,
            self.c_s,
            self.c_p,
            self.l_s,
            self.l_p,
            self.r_p,
            self.q,
            self.d,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// One fully derived row of sweep output.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct ResultPoint {
    /// Stimulus frequency this row was measured at. For measurement sweeps
    /// this repeats the single fixed frequency on every row.
    pub frequency: Hertz,
    /// Compensated impedance the derived set expands from.
    pub impedance: Complex64,
    pub derived: DerivedParameters,
}

impl ResultPoint {
    pub fn new(frequency: Hertz, impedance: Complex64) -> Self {
        let derived = DerivedParameters::from_impedance(impedance, frequency.angular());
        Self {
            frequency,
            impedance,
            derived,
        }
    }
}
