//! Signal buffers exchanged between the synthesizer, the board driver and
//! the lock-in extractor.
//!
//! `StimulusBuffer` travels toward the hardware: one generator period of
//! unsigned sample codes plus the register parameters that control replay.
//! `SampleSet` travels back: raw ADC counts for both input channels. Both
//! are owned, single-run-scoped containers; nothing here aliases device
//! memory.

use crate::device::AWG_BUFFER_LEN;
use crate::units::{Hertz, Volts};
use serde::{Deserialize, Serialize};

/// Stimulus waveform shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaveformShape {
    Sine,
    Square,
    Triangle,
    /// Exponential chirp from `frequency` to `sweep_end` across one buffer.
    Sweep,
    Constant,
}

/// Generator output channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    One,
    Two,
}

impl Channel {
    /// Zero-based hardware index.
    #[inline]
    pub fn index(&self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    /// Parse the 1-based channel number used on the CLI surface.
    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::One),
            2 => Some(Self::Two),
            _ => None,
        }
    }
}

/// One synthesis request. Immutable per call.
#[derive(Clone, Copy, Debug)]
pub struct WaveformSpec {
    /// Peak amplitude, 0..1 V of DAC range.
    pub amplitude: Volts,
    /// Fundamental (or chirp start) frequency.
    pub frequency: Hertz,
    pub shape: WaveformShape,
    /// Chirp end frequency; ignored by every shape except `Sweep`.
    pub sweep_end: Hertz,
}

impl WaveformSpec {
    pub fn sine(amplitude: Volts, frequency: Hertz) -> Self {
        Self {
            amplitude,
            frequency,
            shape: WaveformShape::Sine,
            sweep_end: Hertz::ZERO,
        }
    }

    /// Zero-amplitude spec used to park the generator after a run.
    pub fn idle() -> Self {
        Self::sine(Volts::ZERO, Hertz(1000.0))
    }
}

/// Generator register parameters accompanying a stimulus buffer.
///
/// `wrap` and `step` are 16.16 fixed-point sample counters; `offsgain`
/// packs the DC offset code (high half) with the gain code (low half).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct GeneratorParams {
    pub offsgain: i32,
    pub wrap: u32,
    pub step: u32,
}

/// One generator-buffer period of stimulus samples, bias-shifted into the
/// unsigned 14-bit hardware format.
#[derive(Clone, Debug)]
pub struct StimulusBuffer {
    codes: Vec<u32>,
}

impl StimulusBuffer {
    /// Wrap a full generator period of sample codes.
    ///
    /// # Panics
    ///
    /// Panics if `codes` is not exactly one buffer long.
    pub fn new(codes: Vec<u32>) -> Self {
        assert_eq!(
            codes.len(),
            AWG_BUFFER_LEN,
            "stimulus buffer must hold exactly {} samples, got {}",
            AWG_BUFFER_LEN,
            codes.len()
        );
        Self { codes }
    }

    /// Non-panicking variant of [`StimulusBuffer::new`].
    pub fn try_new(codes: Vec<u32>) -> Result<Self, &'static str> {
        if codes.len() != AWG_BUFFER_LEN {
            return Err("stimulus buffer length must equal the generator period");
        }
        Ok(Self { codes })
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn codes(&self) -> &[u32] {
        &self.codes
    }
}

/// Raw acquired ADC counts, one buffer per input channel.
#[derive(Clone, Debug, Default)]
pub struct SampleSet {
    ch1: Vec<f64>,
    ch2: Vec<f64>,
}

impl SampleSet {
    /// # Panics
    ///
    /// Panics if the channel buffers differ in length.
    pub fn new(ch1: Vec<f64>, ch2: Vec<f64>) -> Self {
        assert_eq!(
            ch1.len(),
            ch2.len(),
            "channel buffers must match: {} vs {}",
            ch1.len(),
            ch2.len()
        );
        Self { ch1, ch2 }
    }

    /// Samples per channel.
    pub fn len(&self) -> usize {
        self.ch1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ch1.is_empty()
    }

    pub fn ch1(&self) -> &[f64] {
        &self.ch1
    }

    pub fn ch2(&self) -> &[f64] {
        &self.ch2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stimulus_buffer_length_enforced() {
        assert!(StimulusBuffer::try_new(vec![0; AWG_BUFFER_LEN]).is_ok());
        assert!(StimulusBuffer::try_new(vec![0; 100]).is_err());
    }

    #[test]
    #[should_panic(expected = "stimulus buffer must hold")]
    fn test_stimulus_buffer_new_panics_on_short_input() {
        let _ = StimulusBuffer::new(vec![0; 3]);
    }

    #[test]
    fn test_channel_numbering() {
        assert_eq!(Channel::from_number(1), Some(Channel::One));
        assert_eq!(Channel::from_number(2), Some(Channel::Two));
        assert_eq!(Channel::from_number(3), None);
        assert_eq!(Channel::Two.index(), 1);
    }

    #[test]
    fn test_idle_spec_is_silent() {
        let spec = WaveformSpec::idle();
        assert_eq!(spec.amplitude, Volts::ZERO);
        assert_eq!(spec.shape, WaveformShape::Sine);
    }
}
