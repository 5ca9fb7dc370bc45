//! Software board: renders the capture an ideal analog front end would
//! produce for a configurable device under test.
//!
//! The simulator decodes the programmed stimulus back out of the generator
//! registers, including the 16.16 phase-step quantization, so round trips
//! through it see the same rounding real hardware applies. Channel 1 plays
//! the generator voltage across the DUT-plus-shunt pair, channel 2 the
//! voltage across the shunt, both in raw ADC counts.
//!
//! Timing delays are honored nominally (recorded, never slept), which keeps
//! sweep tests fast.

use crate::board::{AcquisitionParams, Board, BoardTiming};
use crate::error::{BoardError, BoardResult};
use lib_types::device::{
    ADC_FULL_SCALE, AWG_BUFFER_LEN, DAC_COUNTS_PER_VOLT, SAMPLE_BITS, SAMPLE_RATE,
};
use lib_types::signal::{Channel, GeneratorParams, SampleSet, StimulusBuffer};
use lib_types::units::{Hertz, Ohms, Volts};
use lib_types::Complex64;

/// Device under test seen by the simulated front end.
#[derive(Clone, Copy, Debug)]
pub enum LoadModel {
    /// Ideal resistor.
    Resistor(Ohms),
    /// Resistor in series with a capacitor [F].
    SeriesRc { resistance: Ohms, capacitance: f64 },
    /// Resistor in series with an inductor [H].
    SeriesRl { resistance: Ohms, inductance: f64 },
    /// Frequency-independent complex impedance.
    Fixed(Complex64),
}

impl LoadModel {
    /// Complex impedance at angular frequency `omega`.
    pub fn impedance(&self, omega: f64) -> Complex64 {
        match *self {
            Self::Resistor(r) => Complex64::new(r.0, 0.0),
            Self::SeriesRc {
                resistance,
                capacitance,
            } => Complex64::new(resistance.0, -1.0 / (omega * capacitance)),
            Self::SeriesRl {
                resistance,
                inductance,
            } => Complex64::new(resistance.0, omega * inductance),
            Self::Fixed(z) => z,
        }
    }
}

/// Stimulus state decoded from the last generator write.
#[derive(Clone, Copy, Debug)]
pub struct ProgrammedStimulus {
    pub channel: Channel,
    pub frequency: Hertz,
    pub amplitude: Volts,
}

/// In-memory [`Board`] implementation backing the test suite.
pub struct SimulatedBoard {
    model: LoadModel,
    shunt: Ohms,
    dc_bias: Volts,
    timing: BoardTiming,
    initialized: bool,
    acquisition: Option<AcquisitionParams>,
    stimulus: Option<ProgrammedStimulus>,
    fail_init: bool,
    failing_acquires: u32,
    acquire_count: u64,
}

impl SimulatedBoard {
    pub fn new(model: LoadModel, shunt: Ohms) -> Self {
        Self {
            model,
            shunt,
            dc_bias: Volts::ZERO,
            timing: BoardTiming::default(),
            initialized: false,
            acquisition: None,
            stimulus: None,
            fail_init: false,
            failing_acquires: 0,
            acquire_count: 0,
        }
    }

    /// Applies the ADC gain-correction term the extraction stage will undo.
    pub fn with_dc_bias(mut self, dc_bias: Volts) -> Self {
        self.dc_bias = dc_bias;
        self
    }

    /// Makes `init` fail once, for bring-up error paths.
    pub fn with_init_failure(mut self) -> Self {
        self.fail_init = true;
        self
    }

    /// Swap the device under test, as an operator swapping calibration
    /// fixtures between phases would.
    pub fn set_model(&mut self, model: LoadModel) {
        self.model = model;
    }

    /// Makes the next `n` captures time out, for retry/abort error paths.
    pub fn with_acquire_timeouts(mut self, n: u32) -> Self {
        self.failing_acquires = n;
        self
    }

    /// Overrides the default settle/poll/recovery budget. The simulator
    /// records the budget in timeout errors rather than sleeping through it.
    pub fn with_timing(mut self, timing: BoardTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Last programmed stimulus, if any.
    pub fn stimulus(&self) -> Option<&ProgrammedStimulus> {
        self.stimulus.as_ref()
    }

    /// Number of successful captures.
    pub fn acquire_count(&self) -> u64 {
        self.acquire_count
    }

    fn decode_frequency(params: &GeneratorParams) -> Hertz {
        let counter_span = f64::from(1u32 << 16) * AWG_BUFFER_LEN as f64;
        Hertz(params.step as f64 * SAMPLE_RATE / counter_span)
    }

    fn decode_amplitude(buffer: &StimulusBuffer) -> Volts {
        let peak = buffer
            .codes()
            .iter()
            .map(|&code| {
                let signed = code as i32;
                if signed >= 1 << (SAMPLE_BITS - 1) {
                    signed - (1 << SAMPLE_BITS)
                } else {
                    signed
                }
            })
            .map(i32::abs)
            .max()
            .unwrap_or(0);
        Volts(f64::from(peak) / DAC_COUNTS_PER_VOLT)
    }
}

impl Board for SimulatedBoard {
    fn init(&mut self) -> BoardResult<()> {
        if self.fail_init {
            self.fail_init = false;
            return Err(BoardError::InitFailed("injected bring-up failure".into()));
        }
        self.initialized = true;
        tracing::debug!("simulated board initialized");
        Ok(())
    }

    fn configure_acquisition(&mut self, params: AcquisitionParams) -> BoardResult<()> {
        if !self.initialized {
            return Err(BoardError::NotInitialized {
                operation: "configure_acquisition",
            });
        }
        tracing::debug!(
            decimation = params.decimation.factor(),
            equalization = params.equalization,
            shaping = params.shaping,
            "input chain configured"
        );
        self.acquisition = Some(params);
        Ok(())
    }

    fn write_stimulus(
        &mut self,
        channel: Channel,
        buffer: &StimulusBuffer,
        params: &GeneratorParams,
    ) -> BoardResult<()> {
        if !self.initialized {
            return Err(BoardError::NotInitialized {
                operation: "write_stimulus",
            });
        }
        // The generator replays the table correctly only when the wrap
        // register spans the buffer exactly.
        let expected_wrap = (AWG_BUFFER_LEN as u32 - 1) << 16;
        if params.wrap != expected_wrap {
            return Err(BoardError::StimulusRejected {
                channel: channel.index(),
                reason: format!(
                    "wrap register 0x{:08x} does not span the {} sample buffer",
                    params.wrap, AWG_BUFFER_LEN
                ),
            });
        }
        let stimulus = ProgrammedStimulus {
            channel,
            frequency: Self::decode_frequency(params),
            amplitude: Self::decode_amplitude(buffer),
        };
        tracing::debug!(
            channel = channel.index(),
            frequency_hz = stimulus.frequency.0,
            amplitude_v = stimulus.amplitude.0,
            "stimulus programmed"
        );
        self.stimulus = Some(stimulus);
        Ok(())
    }

    fn acquire(&mut self, sample_count: usize) -> BoardResult<SampleSet> {
        if !self.initialized {
            return Err(BoardError::NotInitialized {
                operation: "acquire",
            });
        }
        let params = self.acquisition.ok_or_else(|| {
            BoardError::InvalidParameters("acquire before configure_acquisition".into())
        })?;
        if self.failing_acquires > 0 {
            self.failing_acquires -= 1;
            return Err(BoardError::AcquisitionTimeout {
                attempts: self.timing.max_polls,
                waited: self.timing.poll_interval * self.timing.max_polls,
            });
        }

        let dt = params.decimation.sample_period().0;
        let counts_per_volt = ADC_FULL_SCALE / (2.0 - self.dc_bias.0);

        // A generator left unprogrammed reads back as a silent front end.
        let (ch1, ch2) = match self.stimulus {
            None => (vec![0.0; sample_count], vec![0.0; sample_count]),
            Some(stim) => {
                let omega = stim.frequency.angular();
                let z = self.model.impedance(omega);
                let shunt = Complex64::new(self.shunt.0, 0.0);
                let loop_current = Complex64::new(stim.amplitude.0, 0.0) / (z + shunt);
                let (v2_mag, v2_arg) = (loop_current * shunt).to_polar();

                let mut ch1 = Vec::with_capacity(sample_count);
                let mut ch2 = Vec::with_capacity(sample_count);
                for k in 0..sample_count {
                    let wt = omega * k as f64 * dt;
                    ch1.push(counts_per_volt * stim.amplitude.0 * wt.cos());
                    ch2.push(counts_per_volt * v2_mag * (wt + v2_arg).cos());
                }
                (ch1, ch2)
            }
        };

        self.acquire_count += 1;
        tracing::debug!(
            sample_count,
            decimation = params.decimation.factor(),
            "simulated capture complete"
        );
        Ok(SampleSet::new(ch1, ch2))
    }
}
