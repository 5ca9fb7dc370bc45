//! Lock-in (single-bin coherent) impedance extraction.
//!
//! The DUT voltage and shunt current are correlated against quadrature
//! references at the stimulus frequency and integrated over the whole
//! acquisition window. This is a single-bin discrete Fourier coefficient:
//! components uncorrelated with the reference (noise, harmonics, drift)
//! integrate toward zero, which is what makes the measurement usable at
//! millivolt stimulus levels. Accuracy relies on the window spanning an
//! integer-ish number of stimulus periods; the sweep planner's sample-count
//! policy guarantees that.

use crate::error::{DspError, DspResult};
use lib_types::device::{Decimation, ADC_FULL_SCALE};
use lib_types::signal::SampleSet;
use lib_types::units::{Ohms, Volts};
use lib_types::Complex64;

use std::f64::consts::PI;

/// Extract one complex impedance estimate from a raw acquisition.
///
/// `size` is the planned acquisition length; the sample set must hold at
/// least that many samples per channel. `omega` is the stimulus angular
/// frequency and `decimation` the factor the acquisition ran at (together
/// they fix the per-sample reference phase increment).
pub fn extract(
    samples: &SampleSet,
    size: usize,
    dc_bias: Volts,
    shunt: Ohms,
    omega: f64,
    decimation: Decimation,
) -> DspResult<Complex64> {
    if !(shunt.0 > 0.0) {
        return Err(DspError::NonPositiveShunt(shunt.0));
    }
    if samples.len() < size {
        return Err(DspError::InsufficientSamples {
            needed: size,
            got: samples.len(),
        });
    }
    // Trapezoidal integration needs at least one interval.
    if size < 2 {
        return Err(DspError::InsufficientSamples {
            needed: 2,
            got: size,
        });
    }

    let t = decimation.sample_period().0;

    // ADC counts to volts, corrected for the programmed DC bias.
    let scale = (2.0 - dc_bias.0) / ADC_FULL_SCALE;

    // Channel 1 sees stimulus, channel 2 sits across the shunt: the
    // difference is the DUT voltage, the shunt voltage gives the current.
    let ch1 = samples.ch1();
    let ch2 = samples.ch2();

    // Quadrature correlation and trapezoidal integration in one pass.
    let mut u_x = 0.0;
    let mut u_y = 0.0;
    let mut i_x = 0.0;
    let mut i_y = 0.0;
    let mut prev = [0.0f64; 4];
    for k in 0..size {
        let v1 = ch1[k] * scale;
        let v2 = ch2[k] * scale;
        let u_dut = v1 - v2;
        let i_dut = v2 / shunt.0;

        let ang = k as f64 * t * omega;
        let (sin_ref, cos_ref) = ang.sin_cos();
        let cur = [
            u_dut * sin_ref,
            u_dut * cos_ref,
            i_dut * sin_ref,
            i_dut * cos_ref,
        ];
        if k > 0 {
            u_x += prev[0] + cur[0];
            u_y += prev[1] + cur[1];
            i_x += prev[2] + cur[2];
            i_y += prev[3] + cur[3];
        }
        prev = cur;
    }
    let half_t = t / 2.0;
    u_x *= half_t;
    u_y *= half_t;
    i_x *= half_t;
    i_y *= half_t;

    let u_amp = 2.0 * u_x.hypot(u_y);
    let u_phase = u_y.atan2(u_x);
    let i_amp = 2.0 * i_x.hypot(i_y);
    let i_phase = i_y.atan2(i_x);

    let z_amp = u_amp / i_amp;
    let z_phase = wrap_phase(u_phase - i_phase);

    tracing::debug!(
        u_amp,
        i_amp,
        z_amp,
        z_phase_deg = z_phase.to_degrees(),
        "lock-in extraction"
    );

    Ok(Complex64::from_polar(z_amp, z_phase))
}

/// Wrap a phase difference into (-pi, pi], adjusting by one full turn at
/// most. Lock-in phase differences live within one turn of zero, so a
/// single correction suffices.
pub fn wrap_phase(d: f64) -> f64 {
    if d > PI {
        d - 2.0 * PI
    } else if d <= -PI {
        d + 2.0 * PI
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // 125 kHz at decimation 1 gives exactly 1000 samples per period, so a
    // 10-period window lands on a clean integer sample count.
    const FREQ: f64 = 125_000.0;
    const PERIOD_SAMPLES: usize = 1000;
    const WINDOW: usize = 10 * PERIOD_SAMPLES + 1;

    /// Render both ADC channels for a DUT impedance `z` driven through a
    /// shunt, with the shunt voltage as a unit-free sine of amplitude
    /// `v2_amp` volts.
    fn render(z: Complex64, shunt: f64, v2_amp: f64, dc_bias: f64) -> SampleSet {
        let omega = 2.0 * PI * FREQ;
        let t = Decimation::Dec1.sample_period().0;
        let scale = ADC_FULL_SCALE / (2.0 - dc_bias);

        let mut ch1 = Vec::with_capacity(WINDOW);
        let mut ch2 = Vec::with_capacity(WINDOW);
        for k in 0..WINDOW {
            let ang = k as f64 * t * omega;
            let v2 = v2_amp * ang.sin();
            // I = v2/shunt, phase-shifted DUT drop of |z| at arg(z)
            let i_amp = v2_amp / shunt;
            let v_dut = i_amp * z.norm() * (ang + z.arg()).sin();
            ch1.push((v_dut + v2) * scale);
            ch2.push(v2 * scale);
        }
        SampleSet::new(ch1, ch2)
    }

    #[test]
    fn test_resistive_dut() {
        let z = Complex64::new(200.0, 0.0);
        let samples = render(z, 100.0, 0.1, 0.0);
        let omega = 2.0 * PI * FREQ;

        let got = extract(&samples, WINDOW, Volts(0.0), Ohms(100.0), omega, Decimation::Dec1)
            .expect("extraction");

        assert_relative_eq!(got.re, 200.0, max_relative = 1e-3);
        assert!(got.im.abs() < 0.5);
    }

    #[test]
    fn test_capacitive_dut_phase() {
        // Pure reactance: Z = -j * 150
        let z = Complex64::new(0.0, -150.0);
        let samples = render(z, 100.0, 0.1, 0.0);
        let omega = 2.0 * PI * FREQ;

        let got = extract(&samples, WINDOW, Volts(0.0), Ohms(100.0), omega, Decimation::Dec1)
            .expect("extraction");

        assert_relative_eq!(got.norm(), 150.0, max_relative = 1e-3);
        assert_relative_eq!(got.arg().to_degrees(), -90.0, epsilon = 0.1);
    }

    #[test]
    fn test_dc_bias_scaling_cancels() {
        // Rendering and extraction use the same bias correction, so the
        // recovered impedance must not depend on it.
        let z = Complex64::new(47.0, 0.0);
        let omega = 2.0 * PI * FREQ;
        let with_bias = render(z, 100.0, 0.1, 0.5);

        let got = extract(&with_bias, WINDOW, Volts(0.5), Ohms(100.0), omega, Decimation::Dec1)
            .expect("extraction");

        assert_relative_eq!(got.re, 47.0, max_relative = 1e-3);
    }

    #[test]
    fn test_window_shorter_than_planned_is_rejected() {
        let samples = SampleSet::new(vec![0.0; 10], vec![0.0; 10]);
        let err = extract(&samples, 11, Volts(0.0), Ohms(100.0), 1.0, Decimation::Dec1)
            .unwrap_err();
        assert!(matches!(err, DspError::InsufficientSamples { needed: 11, got: 10 }));
    }

    #[test]
    fn test_zero_shunt_is_rejected() {
        let samples = SampleSet::new(vec![0.0; 10], vec![0.0; 10]);
        let err =
            extract(&samples, 10, Volts(0.0), Ohms(0.0), 1.0, Decimation::Dec1).unwrap_err();
        assert!(matches!(err, DspError::NonPositiveShunt(_)));
    }

    #[test]
    fn test_wrap_phase_interval() {
        assert_relative_eq!(wrap_phase(3.0 * PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(PI), PI, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(-PI), PI, epsilon = 1e-12);

        let eps = 1e-9;
        assert_relative_eq!(wrap_phase(PI + eps), -PI + eps, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(-PI - eps), PI - eps, epsilon = 1e-12);
        assert_relative_eq!(wrap_phase(0.25), 0.25, epsilon = 1e-15);
    }
}
