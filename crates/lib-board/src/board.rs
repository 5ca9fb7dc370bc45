//! Board abstraction: the four driver operations a sweep needs.
//!
//! The controller never touches device registers directly; it talks to a
//! [`Board`] implementation. The production implementation wraps the
//! oscilloscope/generator kernel driver on the instrument itself; the
//! [`crate::sim::SimulatedBoard`] renders what an ideal front end would
//! capture and backs the test suite.

use crate::error::BoardResult;
use lib_types::device::Decimation;
use lib_types::signal::{Channel, GeneratorParams, SampleSet, StimulusBuffer};
use std::time::Duration;

/// Input-chain configuration for one capture.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AcquisitionParams {
    pub decimation: Decimation,
    /// Equalization filter in the analog input chain.
    pub equalization: bool,
    /// Shaping filter in the analog input chain.
    pub shaping: bool,
}

impl AcquisitionParams {
    pub fn new(decimation: Decimation) -> Self {
        Self {
            decimation,
            equalization: false,
            shaping: false,
        }
    }

    pub fn with_filters(decimation: Decimation, equalization: bool, shaping: bool) -> Self {
        Self {
            decimation,
            equalization,
            shaping,
        }
    }
}

/// Timing budget for the blocking acquisition path.
///
/// The driver needs a settle pause after reconfiguration before the first
/// poll, and the instrument misbehaves without a short pause after each
/// capture, so both delays are part of the contract rather than caller
/// courtesy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardTiming {
    /// Settle delay between (re)configuring and the first trigger poll.
    pub pre_acquire_delay: Duration,
    /// Pause between trigger polls.
    pub poll_interval: Duration,
    /// Poll attempts before the acquisition counts as timed out.
    pub max_polls: u32,
    /// Recovery delay after each capture.
    pub post_acquire_delay: Duration,
}

impl Default for BoardTiming {
    fn default() -> Self {
        Self {
            pre_acquire_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
            max_polls: 150_000,
            post_acquire_delay: Duration::from_millis(30),
        }
    }
}

/// Driver surface the sweep controller runs against.
///
/// Call order is `init` once, then any number of
/// `write_stimulus`/`configure_acquisition`/`acquire` rounds.
/// Implementations reject out-of-order calls instead of guessing.
pub trait Board {
    /// Bring the instrument to a known state.
    fn init(&mut self) -> BoardResult<()>;

    /// Program the input chain for the next capture.
    fn configure_acquisition(&mut self, params: AcquisitionParams) -> BoardResult<()>;

    /// Load one generator period and start replaying it on `channel`.
    fn write_stimulus(
        &mut self,
        channel: Channel,
        buffer: &StimulusBuffer,
        params: &GeneratorParams,
    ) -> BoardResult<()>;

    /// Capture `sample_count` samples from both input channels.
    ///
    /// Blocks until the buffer fills or the [`BoardTiming`] retry budget
    /// runs out.
    fn acquire(&mut self, sample_count: usize) -> BoardResult<SampleSet>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_budget() {
        let timing = BoardTiming::default();
        assert_eq!(timing.pre_acquire_delay, Duration::from_millis(50));
        assert_eq!(timing.poll_interval, Duration::from_millis(1));
        assert_eq!(timing.max_polls, 150_000);
        assert_eq!(timing.post_acquire_delay, Duration::from_millis(30));
    }

    #[test]
    fn test_acquisition_params_default_filters_off() {
        let params = AcquisitionParams::new(Decimation::Dec64);
        assert!(!params.equalization);
        assert!(!params.shaping);
        assert_eq!(params.decimation, Decimation::Dec64);
    }
}
