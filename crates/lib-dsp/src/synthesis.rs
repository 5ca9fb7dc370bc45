//! Stimulus synthesis for the arbitrary waveform generator.
//!
//! Produces one generator-buffer period of sample codes plus the register
//! parameters (offset/gain, wrap, phase step) that control its replay. The
//! generator replays the 16384-sample buffer continuously; the phase-step
//! register, not the buffer content, sets the output frequency for the
//! periodic shapes.

use lib_types::device::{
    AWG_BUFFER_LEN, DAC_COUNTS_PER_VOLT, DAC_DC_OFFSET, DAC_MAX_COUNT, SAMPLE_BITS, SAMPLE_RATE,
};
use lib_types::signal::{GeneratorParams, StimulusBuffer, WaveformShape, WaveformSpec};

use std::f64::consts::PI;

/// Width of the square-wave transition ramp at 1 MHz [samples].
const SQUARE_RAMP_PER_MHZ: f64 = 300.0;

/// Ramp width used when the frequency-scaled width collapses [samples].
const SQUARE_RAMP_MIN: i32 = 30;

/// Buffer fraction where the square wave's falling edge sits.
const SQUARE_FALL_AT: f64 = 0.249;

/// Buffer fraction where the square wave's rising edge sits.
const SQUARE_RISE_AT: f64 = 0.75;

/// Synthesize one generator period for `spec`.
///
/// Amplitude maps to DAC counts (1 V => 4000) and silently clamps at the
/// 8191-count ceiling. Negative samples are wrapped into the unsigned
/// 14-bit range before hand-off. Pure function of the spec and the device
/// constants.
///
/// # Panics
///
/// Panics for the `Sweep` shape when the chirp range is degenerate
/// (non-positive frequencies or equal endpoints); callers validate the
/// range before synthesis.
pub fn synthesize(spec: &WaveformSpec) -> (StimulusBuffer, GeneratorParams) {
    let n = AWG_BUFFER_LEN as f64;
    let freq = spec.frequency.0;

    let params = GeneratorParams {
        offsgain: (DAC_DC_OFFSET << 16) + 0x1fff,
        wrap: (65536.0 * (n - 1.0)).round() as u32,
        step: (65536.0 * freq / SAMPLE_RATE * n).round() as u32,
    };

    let mut amp = (spec.amplitude.0 * DAC_COUNTS_PER_VOLT) as u32;
    if amp > DAC_MAX_COUNT {
        // Truncate to max value if needed
        amp = DAC_MAX_COUNT;
    }
    let amp = amp as i32;

    let samples = match spec.shape {
        WaveformShape::Sine => fill_sine(amp),
        WaveformShape::Square => fill_square(amp, freq),
        WaveformShape::Triangle => fill_triangle(amp),
        WaveformShape::Sweep => fill_chirp(amp, freq, spec.sweep_end.0),
        WaveformShape::Constant => vec![amp; AWG_BUFFER_LEN],
    };

    let codes = samples
        .into_iter()
        .map(|v| if v < 0 { (v + (1 << SAMPLE_BITS)) as u32 } else { v as u32 })
        .collect();

    (StimulusBuffer::new(codes), params)
}

fn fill_sine(amp: i32) -> Vec<i32> {
    let n = AWG_BUFFER_LEN as f64;
    (0..AWG_BUFFER_LEN)
        .map(|i| (amp as f64 * (2.0 * PI * i as f64 / n).cos()).round() as i32)
        .collect()
}

/// Hard-clipped cosine with linear ramps at the polarity changes. A true
/// step cannot be reproduced by the replayed buffer, so each edge gets a
/// ramp whose width scales with frequency (300 samples at 1 MHz).
fn fill_square(amp: i32, freq: f64) -> Vec<i32> {
    let n = AWG_BUFFER_LEN as f64;

    let mut trans = (freq / 1e6 * SQUARE_RAMP_PER_MHZ) as i32;
    if trans <= 10 {
        trans = SQUARE_RAMP_MIN;
    }
    let trans = trans as f64;

    let fall_start = n * SQUARE_FALL_AT;
    let rise_start = n * SQUARE_RISE_AT;

    (0..AWG_BUFFER_LEN)
        .map(|i| {
            let xx = i as f64;
            let cosine = (amp as f64 * (2.0 * PI * xx / n).cos()).round();
            let mut v = if cosine > 0.0 { amp } else { -amp };

            if xx > fall_start && xx <= fall_start + trans {
                v = ramp_value(xx, fall_start, trans, amp as f64, -(amp as f64));
            }
            if xx > rise_start && xx <= rise_start + trans {
                v = ramp_value(xx, rise_start, trans, -(amp as f64), amp as f64);
            }
            v
        })
        .collect()
}

/// Linear interpolation from `y1` at `x1` to `y2` at `x1 + width`.
fn ramp_value(xx: f64, x1: f64, width: f64, y1: f64, y2: f64) -> i32 {
    let mm = (y2 - y1) / width;
    let qq = y1 - mm * x1;
    (mm * xx + qq).round() as i32
}

fn fill_triangle(amp: i32) -> Vec<i32> {
    let n = AWG_BUFFER_LEN as f64;
    (0..AWG_BUFFER_LEN)
        .map(|i| {
            let phase = (2.0 * PI * i as f64 / n).cos().acos();
            (-(amp as f64) * (phase / PI * 2.0 - 1.0)).round() as i32
        })
        .collect()
}

/// Exponential chirp from `freq` to `end_freq` across the buffer duration,
/// computed from the closed-form instantaneous-phase integral so frequency
/// varies continuously within the single replay period.
fn fill_chirp(amp: i32, freq: f64, end_freq: f64) -> Vec<i32> {
    let n = AWG_BUFFER_LEN as f64;
    let start = 2.0 * PI * freq;
    let end = 2.0 * PI * end_freq;
    let ratio = end / start;
    assert!(
        ratio.is_finite() && ratio > 0.0 && ratio != 1.0,
        "chirp endpoints must be positive and distinct"
    );

    let k = ratio.ln();
    let period = n / SAMPLE_RATE;

    (0..AWG_BUFFER_LEN)
        .map(|i| {
            let t = i as f64 / SAMPLE_RATE;
            let phase = (start * period) / k * ((t * k / period).exp() - 1.0);
            (amp as f64 * phase.sin()).round() as i32
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_types::units::{Hertz, Volts};

    fn spec(shape: WaveformShape, amplitude: f64, freq: f64) -> WaveformSpec {
        WaveformSpec {
            amplitude: Volts(amplitude),
            frequency: Hertz(freq),
            shape,
            sweep_end: Hertz(freq * 10.0),
        }
    }

    #[test]
    fn test_register_params_at_1khz() {
        let (_, params) = synthesize(&spec(WaveformShape::Sine, 0.5, 1000.0));

        // 65536 * 1000 / 125e6 * 16384
        assert_eq!(params.step, 8590);
        assert_eq!(params.wrap, 65536 * 16383);
        assert_eq!(params.offsgain, (-155 << 16) + 0x1fff);
    }

    #[test]
    fn test_sine_extremes_and_wrap() {
        let (buf, _) = synthesize(&spec(WaveformShape::Sine, 0.5, 1000.0));
        let codes = buf.codes();

        // cos(0) = 1 => +2000 counts; cos(pi) = -1 => -2000, wrapped
        assert_eq!(codes[0], 2000);
        assert_eq!(codes[AWG_BUFFER_LEN / 2], (1 << SAMPLE_BITS) - 2000);
    }

    #[test]
    fn test_all_codes_fit_14_bits() {
        for shape in [
            WaveformShape::Sine,
            WaveformShape::Square,
            WaveformShape::Triangle,
            WaveformShape::Sweep,
            WaveformShape::Constant,
        ] {
            let (buf, _) = synthesize(&spec(shape, 1.0, 5000.0));
            assert!(
                buf.codes().iter().all(|&c| c < (1 << SAMPLE_BITS)),
                "{:?} emitted an out-of-range code",
                shape
            );
        }
    }

    #[test]
    fn test_amplitude_clamps_at_dac_ceiling() {
        // 3 V would be 12000 counts; the DAC tops out at 8191.
        let (buf, _) = synthesize(&spec(WaveformShape::Constant, 3.0, 1000.0));
        assert!(buf.codes().iter().all(|&c| c == DAC_MAX_COUNT));
    }

    #[test]
    fn test_zero_amplitude_parks_output() {
        let (buf, _) = synthesize(&WaveformSpec::idle());
        assert!(buf.codes().iter().all(|&c| c == 0));
    }

    #[test]
    fn test_square_is_clipped_outside_ramps() {
        let (buf, _) = synthesize(&spec(WaveformShape::Square, 0.5, 1000.0));
        let codes = buf.codes();

        // Low frequency => minimum ramp width of 30 samples around the two
        // polarity changes; everything else sits at +/-2000.
        let plus = 2000u32;
        let minus = (1 << SAMPLE_BITS) - 2000;
        assert_eq!(codes[0], plus);
        assert_eq!(codes[AWG_BUFFER_LEN / 2], minus);
        let clipped = codes
            .iter()
            .filter(|&&c| c == plus || c == minus)
            .count();
        assert!(clipped > AWG_BUFFER_LEN - 2 * 31);
    }

    #[test]
    fn test_triangle_endpoints() {
        let (buf, _) = synthesize(&spec(WaveformShape::Triangle, 0.5, 1000.0));
        let codes = buf.codes();

        // acos(cos(0)) = 0 => +amp; acos(cos(pi)) = pi => -amp (wrapped)
        assert_eq!(codes[0], 2000);
        assert_eq!(codes[AWG_BUFFER_LEN / 2], (1 << SAMPLE_BITS) - 2000);
    }

    #[test]
    fn test_chirp_starts_at_zero_phase() {
        let (buf, _) = synthesize(&spec(WaveformShape::Sweep, 0.5, 1000.0));
        assert_eq!(buf.codes()[0], 0);
    }

    #[test]
    #[should_panic(expected = "chirp endpoints")]
    fn test_degenerate_chirp_panics() {
        let bad = WaveformSpec {
            sweep_end: Hertz(1000.0),
            ..spec(WaveformShape::Sweep, 0.5, 1000.0)
        };
        let _ = synthesize(&bad);
    }
}
