//! Error types for DSP operations.

use thiserror::Error;

/// Errors that can occur during DSP operations.
#[derive(Debug, Error)]
pub enum DspError {
    /// Stimulus frequency below the lowest decimation band.
    #[error("frequency {0} Hz is below the 2.5 Hz decimation floor")]
    FrequencyBelowBandFloor(f64),

    /// Stimulus frequency above the device limit.
    #[error("frequency {0} Hz exceeds the device maximum of 62.5 MHz")]
    FrequencyAboveDeviceMax(f64),

    /// Acquisition shorter than the lock-in needs.
    #[error("insufficient samples: need at least {needed}, got {got}")]
    InsufficientSamples { needed: usize, got: usize },

    /// Shunt resistance must be positive for Ohm's-law current recovery.
    #[error("shunt resistance must be positive, got {0} Ohm")]
    NonPositiveShunt(f64),

    /// Sweep range cannot be planned.
    #[error("invalid sweep range: {0}")]
    InvalidSweepRange(String),

    /// Sweep step count cannot be planned.
    #[error("invalid step count: {0}")]
    InvalidStepCount(String),
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;
