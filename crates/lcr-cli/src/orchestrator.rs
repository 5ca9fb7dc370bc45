//! Measurement orchestration.
//!
//! Drives the board through the calibration phases the configured mode
//! requires, and within each phase through warm-up, sweep stepping and
//! per-step averaging. Raw captures are reduced to one complex impedance
//! per recorded step; compensation and derived-parameter expansion happen
//! once all phases are in.

use crate::config::MeasureConfig;
use anyhow::{Context, Result};
use lib_board::{AcquisitionParams, Board, PhaseGate, ProgressSink};
use lib_dsp::{compensation, lockin, synthesis, SweepPlan, SweepStep};
use lib_types::impedance::ResultPoint;
use lib_types::signal::WaveformSpec;
use lib_types::sweep::{CalibMode, CalibrationSet};
use lib_types::Complex64;

/// Measurement orchestrator. Borrows the board for the duration of the run
/// so a hardware backend and the simulator drive through the same path.
/// Fixture changes go through the [`PhaseGate`] seam; the orchestrator
/// itself never reads the console.
pub struct Orchestrator<'a, B, P, G> {
    config: MeasureConfig,
    plan: SweepPlan,
    board: &'a mut B,
    progress: &'a mut P,
    gate: &'a mut G,
}

impl<'a, B: Board, P: ProgressSink, G: PhaseGate> Orchestrator<'a, B, P, G> {
    /// Create a new orchestrator for a validated configuration.
    pub fn new(
        config: MeasureConfig,
        board: &'a mut B,
        progress: &'a mut P,
        gate: &'a mut G,
    ) -> Result<Self> {
        let plan = config
            .sweep_plan()
            .context("Configuration does not describe a measurable sweep")?;
        Ok(Self {
            config,
            plan,
            board,
            progress,
            gate,
        })
    }

    /// Run the full measurement.
    pub fn run(mut self) -> Result<SweepResults> {
        tracing::info!("Starting measurement: {}", self.config.name);
        self.board
            .init()
            .context("Failed to initialize the board")?;

        let requested = self.config.calibration;
        let mut set = CalibrationSet::new();
        for &phase in requested.phases() {
            self.gate
                .confirm(phase)
                .with_context(|| format!("Failed to confirm the {} phase", phase.label()))?;
            tracing::info!("Running {} phase", phase.label());
            let readings = self.run_phase()?;
            set.set_phase(phase, readings);
        }

        let mode = compensation::effective_mode(requested, &set);
        let corrected = compensation::compensate_sweep(mode, &set, self.config.z_ref());

        let points: Vec<ResultPoint> = self
            .plan
            .frequencies()
            .into_iter()
            .zip(corrected)
            .map(|(frequency, z)| ResultPoint::new(frequency, z))
            .collect();

        self.park_generator()?;

        tracing::info!("Measurement complete: {} steps", points.len());
        Ok(SweepResults {
            calibration: mode,
            points,
        })
    }

    /// One pass over the sweep: warm-up cycles whose readings are thrown
    /// away, then one averaged impedance per recorded step.
    fn run_phase(&mut self) -> Result<Vec<Complex64>> {
        let total = self.plan.total_cycles();
        let mut completed = 0usize;

        // Warm-up captures let the analog chain and the DUT settle before
        // anything is recorded.
        for frequency in self.plan.warmup_frequencies() {
            let step = self.plan.step_for_frequency(frequency)?;
            self.measure_step(&step)?;
            completed += 1;
            self.report(completed, total);
        }

        let mut readings = Vec::with_capacity(self.plan.steps());
        for frequency in self.plan.frequencies() {
            let step = self.plan.step_for_frequency(frequency)?;
            let z = self.measure_step(&step)?;
            tracing::debug!(
                frequency = step.frequency.0,
                re = z.re,
                im = z.im,
                "step measured"
            );
            readings.push(z);
            completed += 1;
            self.report(completed, total);
        }

        Ok(readings)
    }

    /// Program the stimulus for one step and average the configured number
    /// of captures into a single impedance estimate.
    fn measure_step(&mut self, step: &SweepStep) -> Result<Complex64> {
        let spec = WaveformSpec::sine(self.config.amplitude(), step.frequency);
        let (buffer, params) = synthesis::synthesize(&spec);
        self.board
            .write_stimulus(self.config.channel(), &buffer, &params)
            .with_context(|| format!("Failed to program stimulus at {} Hz", step.frequency.0))?;

        let acquisition = AcquisitionParams::with_filters(
            step.decimation,
            self.config.filters.equalization,
            self.config.filters.shaping,
        );

        let mut sum = Complex64::new(0.0, 0.0);
        for _ in 0..self.config.averaging {
            self.board
                .configure_acquisition(acquisition)
                .context("Failed to configure acquisition")?;
            let samples = self
                .board
                .acquire(step.sample_count)
                .with_context(|| format!("Failed to acquire {} samples", step.sample_count))?;
            sum += lockin::extract(
                &samples,
                step.sample_count,
                self.config.dc_bias(),
                self.config.shunt(),
                step.frequency.angular(),
                step.decimation,
            )?;
        }

        Ok(sum / f64::from(self.config.averaging))
    }

    fn report(&mut self, completed: usize, total: usize) {
        let percent = (100.0 * completed as f64 / total as f64).round() as u8;
        self.progress.report(percent.min(100));
    }

    /// Zero-amplitude stimulus keeps the DAC from free-running between runs.
    fn park_generator(&mut self) -> Result<()> {
        let (buffer, params) = synthesis::synthesize(&WaveformSpec::idle());
        self.board
            .write_stimulus(self.config.channel(), &buffer, &params)
            .context("Failed to park the generator")?;
        Ok(())
    }
}

/// Measurement results.
#[derive(Clone, Debug)]
pub struct SweepResults {
    /// Compensation mode actually applied. Degrades to [`CalibMode::None`]
    /// when the collected calibration data is incomplete.
    pub calibration: CalibMode,

    /// One fully derived row per recorded sweep step.
    pub points: Vec<ResultPoint>,
}
