//! Sweep planning: step frequencies, per-step acquisition geometry, and the
//! warm-up schedule that precedes the recorded steps.
//!
//! A [`SweepPlan`] is pure arithmetic and owns no hardware state. The
//! controller walks the plan once per calibration phase and discards the
//! warm-up cycles, which exist only to let the analog front end settle
//! before the first recorded point.

use lib_types::device::{Decimation, MAX_FREQUENCY, MIN_FREQUENCY, SAMPLE_RATE};
use lib_types::sweep::{ScaleType, SweepKind};
use lib_types::Hertz;

use crate::error::{DspError, DspResult};

/// Upper bound on warm-up cycles per phase. Short sweeps warm up with at
/// most as many cycles as they have steps.
pub const MAX_WARMUP_CYCLES: usize = 10;

/// Acquisition geometry for a single sweep step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStep {
    pub frequency: Hertz,
    pub decimation: Decimation,
    /// Number of samples to capture, sized to cover a whole number of
    /// stimulus periods at the decimated rate.
    pub sample_count: usize,
}

/// Validated sweep geometry shared by every calibration phase of a run.
#[derive(Debug, Clone)]
pub struct SweepPlan {
    kind: SweepKind,
    scale: ScaleType,
    start: Hertz,
    end: Hertz,
    steps: usize,
}

impl SweepPlan {
    /// Builds a plan, rejecting geometry the hardware cannot honor.
    ///
    /// The end frequency only participates in frequency sweeps; a
    /// measurement sweep stays at `start` for every step and ignores it.
    pub fn new(
        kind: SweepKind,
        scale: ScaleType,
        start: Hertz,
        end: Hertz,
        steps: usize,
    ) -> DspResult<Self> {
        if steps == 0 {
            return Err(DspError::InvalidStepCount(
                "sweep needs at least one step".into(),
            ));
        }
        if start.0 < MIN_FREQUENCY.0 {
            return Err(DspError::FrequencyBelowBandFloor(start.0));
        }
        if start.0 > MAX_FREQUENCY.0 {
            return Err(DspError::FrequencyAboveDeviceMax(start.0));
        }
        if kind == SweepKind::Frequency {
            if end.0 > MAX_FREQUENCY.0 {
                return Err(DspError::FrequencyAboveDeviceMax(end.0));
            }
            if end.0 < start.0 {
                return Err(DspError::InvalidSweepRange(format!(
                    "end frequency {} Hz is below start frequency {} Hz",
                    end.0, start.0
                )));
            }
        }
        Ok(Self {
            kind,
            scale,
            start,
            end,
            steps,
        })
    }

    pub fn kind(&self) -> SweepKind {
        self.kind
    }

    pub fn scale(&self) -> ScaleType {
        self.scale
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn start(&self) -> Hertz {
        self.start
    }

    pub fn end(&self) -> Hertz {
        self.end
    }

    /// Stimulus periods each capture must span. Low-frequency measurement
    /// sweeps trade periods for throughput; everything else integrates over
    /// ten.
    pub fn min_periods(&self) -> u32 {
        if self.kind == SweepKind::Measurement && self.start.0 < 100.0 {
            2
        } else {
            10
        }
    }

    /// Recorded step frequencies, in execution order. Endpoints are
    /// inclusive; a single-step sweep sits at `start`.
    pub fn frequencies(&self) -> Vec<Hertz> {
        match self.kind {
            SweepKind::Measurement => vec![self.start; self.steps],
            SweepKind::Frequency => {
                if self.steps == 1 {
                    return vec![self.start];
                }
                let span = (self.steps - 1) as f64;
                (0..self.steps)
                    .map(|i| {
                        let t = i as f64 / span;
                        let f = match self.scale {
                            ScaleType::Linear => {
                                self.start.0 + (self.end.0 - self.start.0) * t
                            }
                            ScaleType::Logarithmic => {
                                let a = self.start.0.log10();
                                let b = self.end.0.log10();
                                10f64.powf(a + (b - a) * t)
                            }
                        };
                        Hertz(f)
                    })
                    .collect()
            }
        }
    }

    /// Resolves the acquisition geometry for one stimulus frequency.
    pub fn step_for_frequency(&self, frequency: Hertz) -> DspResult<SweepStep> {
        if frequency.0 > MAX_FREQUENCY.0 {
            return Err(DspError::FrequencyAboveDeviceMax(frequency.0));
        }
        let decimation = Decimation::for_frequency(frequency)
            .ok_or(DspError::FrequencyBelowBandFloor(frequency.0))?;
        let samples_per_period = SAMPLE_RATE / (frequency.0 * decimation.factor() as f64);
        let sample_count =
            (f64::from(self.min_periods()) * samples_per_period).round() as usize;
        Ok(SweepStep {
            frequency,
            decimation,
            sample_count,
        })
    }

    /// Geometry for every recorded step, in execution order.
    pub fn measurement_steps(&self) -> DspResult<Vec<SweepStep>> {
        self.frequencies()
            .into_iter()
            .map(|f| self.step_for_frequency(f))
            .collect()
    }

    /// Stimulus frequencies of the discarded warm-up cycles, in execution
    /// order. A measurement sweep repeats its fixed frequency once per
    /// recorded step, capped at [`MAX_WARMUP_CYCLES`]. A frequency sweep
    /// descends from `start` toward half of it so the front end settles
    /// approaching the first recorded point from below; the final settling
    /// cycle lands back on `start` and doubles as the first recorded step,
    /// so the ramp holds one cycle fewer than the cap. Ramp values are
    /// floored at the lowest usable band so a sweep starting at the band
    /// floor still warms up.
    pub fn warmup_frequencies(&self) -> Vec<Hertz> {
        let warmup = self.steps.min(MAX_WARMUP_CYCLES);
        match self.kind {
            SweepKind::Measurement => vec![self.start; warmup],
            SweepKind::Frequency => {
                let half = self.start.0 / 2.0;
                (2..=warmup)
                    .rev()
                    .map(|countdown| {
                        let f = half + half * countdown as f64 / warmup as f64;
                        Hertz(f.max(MIN_FREQUENCY.0))
                    })
                    .collect()
            }
        }
    }

    /// Cycles one phase executes: warm-up plus recorded steps. Drives the
    /// progress denominator.
    pub fn total_cycles(&self) -> usize {
        self.steps + self.warmup_frequencies().len()
    }
}
