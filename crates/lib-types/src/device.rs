//! Fixed characteristics of the generation/acquisition board.
//!
//! Everything here is a hardware property: the generator and ADC share one
//! 125 MHz clock, the generator replays a 16384-sample buffer, and the
//! acquisition path offers six fixed decimation factors. These values are
//! not configurable at run time.

use crate::units::{Hertz, Seconds};
use serde::{Deserialize, Serialize};

/// Generator/ADC sample rate [Hz].
pub const SAMPLE_RATE: f64 = 125e6;

/// Generator buffer length [samples]. One replay period.
pub const AWG_BUFFER_LEN: usize = 16 * 1024;

/// DAC counts per volt of programmed amplitude (1 V => 4000 counts).
pub const DAC_COUNTS_PER_VOLT: f64 = 4000.0;

/// Largest representable DAC count. Amplitudes scaling above this are
/// silently clamped, not rejected.
pub const DAC_MAX_COUNT: u32 = 8191;

/// Width of the generator/ADC sample data paths [bits].
pub const SAMPLE_BITS: u32 = 14;

/// ADC full-scale divisor (2^SAMPLE_BITS).
pub const ADC_FULL_SCALE: f64 = 16384.0;

/// DC offset code folded into the generator offset/gain register.
pub const DAC_DC_OFFSET: i32 = -155;

/// Maximal stimulus frequency.
pub const MAX_FREQUENCY: Hertz = Hertz(62.5e6);

/// Lowest frequency any decimation band covers. Below this the acquisition
/// window cannot span enough stimulus periods.
pub const MIN_FREQUENCY: Hertz = Hertz(2.5);

/// Maximal stimulus amplitude [V].
pub const MAX_AMPLITUDE: f64 = 1.0;

/// Down-sampling factor applied by the acquisition path before samples
/// reach the host.
///
/// The board supports exactly six factors. Selection is by stimulus
/// frequency band: high frequencies need the full rate to resolve the
/// carrier, low frequencies need deep decimation so a handful of periods
/// still fits the capture buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decimation {
    Dec1,
    Dec8,
    Dec64,
    Dec1024,
    Dec8192,
    Dec65536,
}

impl Decimation {
    /// Numeric down-sampling factor.
    pub fn factor(&self) -> u32 {
        match self {
            Self::Dec1 => 1,
            Self::Dec8 => 8,
            Self::Dec64 => 64,
            Self::Dec1024 => 1024,
            Self::Dec8192 => 8192,
            Self::Dec65536 => 65536,
        }
    }

    /// Hardware register index (position in the board's decimation table).
    pub fn index(&self) -> u32 {
        match self {
            Self::Dec1 => 0,
            Self::Dec8 => 1,
            Self::Dec64 => 2,
            Self::Dec1024 => 3,
            Self::Dec8192 => 4,
            Self::Dec65536 => 5,
        }
    }

    /// Effective sample period seen by the host at this decimation.
    pub fn sample_period(&self) -> Seconds {
        Seconds(self.factor() as f64 / SAMPLE_RATE)
    }

    /// Select the decimation band for a stimulus frequency.
    ///
    /// Bands, low to high: [2.5, 20) => 65536, [20, 160) => 8192,
    /// [160, 2500) => 1024, [2500, 20000) => 64, [20000, 160000) => 8,
    /// [160000, inf) => 1. Returns `None` below 2.5 Hz; no band covers it.
    pub fn for_frequency(freq: Hertz) -> Option<Self> {
        let f = freq.0;
        if f >= 160_000.0 {
            Some(Self::Dec1)
        } else if f >= 20_000.0 {
            Some(Self::Dec8)
        } else if f >= 2_500.0 {
            Some(Self::Dec64)
        } else if f >= 160.0 {
            Some(Self::Dec1024)
        } else if f >= 20.0 {
            Some(Self::Dec8192)
        } else if f >= 2.5 {
            Some(Self::Dec65536)
        } else {
            None
        }
    }
}
