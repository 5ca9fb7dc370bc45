//! Sweep and calibration vocabulary shared across the workspace.
//!
//! The measurement loop is keyed by these enums end to end: which sweep
//! kind runs, how frequencies are spaced, which calibration phases are
//! visited and under which correction model the collected observations are
//! combined.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// What the outer measurement loop iterates over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepKind {
    /// Repeat the whole measurement at one fixed frequency; each repetition
    /// yields one result row.
    Measurement,
    /// Step the stimulus across a frequency range; each frequency yields
    /// one result row.
    Frequency,
}

/// Frequency spacing for a frequency sweep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScaleType {
    Linear,
    Logarithmic,
}

/// Correction model applied when combining calibration observations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibMode {
    /// No correction; measured impedance is reported unchanged.
    None,
    /// Open/short/reference-load three-point correction.
    OpenShortLoad,
    /// Open/short correction without an explicit reference impedance.
    OpenShort,
}

impl CalibMode {
    /// Calibration phases visited for this mode, in measurement order.
    ///
    /// Both corrected modes visit all four phases: the open/short model
    /// still measures the reference-load fixture because its combination
    /// formula references that observation (see the compensation module).
    pub fn phases(&self) -> &'static [CalibPhase] {
        match self {
            Self::None => &[CalibPhase::Measure],
            Self::OpenShortLoad | Self::OpenShort => &[
                CalibPhase::Short,
                CalibPhase::Open,
                CalibPhase::ReferenceLoad,
                CalibPhase::Measure,
            ],
        }
    }

    /// True when this mode needs operator-supplied calibration fixtures.
    pub fn is_calibrated(&self) -> bool {
        !matches!(self, Self::None)
    }
}

/// One pass of the measurement loop: which fixture the operator has
/// connected while the readings are collected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CalibPhase {
    Short,
    Open,
    ReferenceLoad,
    Measure,
}

impl CalibPhase {
    pub const ALL: [CalibPhase; 4] = [
        CalibPhase::Short,
        CalibPhase::Open,
        CalibPhase::ReferenceLoad,
        CalibPhase::Measure,
    ];

    /// Human-readable label for logs and prompts.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Open => "open",
            Self::ReferenceLoad => "reference load",
            Self::Measure => "measure",
        }
    }
}

/// Per-phase impedance observations accumulated across one run, keyed by
/// [`CalibPhase`] rather than a raw loop index.
///
/// Invariant at compensation time: every phase that was visited holds one
/// observation per sweep step. Phases that were never visited stay empty
/// and the compensation layer falls back to uncorrected output.
#[derive(Clone, Debug, Default)]
pub struct CalibrationSet {
    short: Vec<Complex64>,
    open: Vec<Complex64>,
    load: Vec<Complex64>,
    measured: Vec<Complex64>,
}

impl CalibrationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the per-step readings for one phase, replacing any previous
    /// readings for that phase.
    pub fn set_phase(&mut self, phase: CalibPhase, readings: Vec<Complex64>) {
        *self.slot_mut(phase) = readings;
    }

    /// Per-step readings for one phase; empty if the phase never ran.
    pub fn phase(&self, phase: CalibPhase) -> &[Complex64] {
        match phase {
            CalibPhase::Short => &self.short,
            CalibPhase::Open => &self.open,
            CalibPhase::ReferenceLoad => &self.load,
            CalibPhase::Measure => &self.measured,
        }
    }

    /// Whether any readings were collected for the phase.
    pub fn has(&self, phase: CalibPhase) -> bool {
        !self.phase(phase).is_empty()
    }

    /// True when every phase in `phases` holds exactly `steps` readings.
    pub fn is_complete(&self, phases: &[CalibPhase], steps: usize) -> bool {
        phases.iter().all(|p| self.phase(*p).len() == steps)
    }

    fn slot_mut(&mut self, phase: CalibPhase) -> &mut Vec<Complex64> {
        match phase {
            CalibPhase::Short => &mut self.short,
            CalibPhase::Open => &mut self.open,
            CalibPhase::ReferenceLoad => &mut self.load,
            CalibPhase::Measure => &mut self.measured,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_schedule_per_mode() {
        assert_eq!(CalibMode::None.phases(), &[CalibPhase::Measure]);
        assert_eq!(CalibMode::OpenShortLoad.phases(), &CalibPhase::ALL);
        // Open/short still visits the load fixture; its formula uses it.
        assert!(CalibMode::OpenShort
            .phases()
            .contains(&CalibPhase::ReferenceLoad));
    }

    #[test]
    fn test_calibration_set_completeness() {
        let mut set = CalibrationSet::new();
        set.set_phase(CalibPhase::Measure, vec![Complex64::new(1.0, 0.0); 3]);

        assert!(set.is_complete(&[CalibPhase::Measure], 3));
        assert!(!set.is_complete(&[CalibPhase::Measure], 4));
        assert!(!set.is_complete(CalibMode::OpenShort.phases(), 3));
        assert!(set.has(CalibPhase::Measure));
        assert!(!set.has(CalibPhase::Short));
    }

    #[test]
    fn test_set_phase_replaces() {
        let mut set = CalibrationSet::new();
        set.set_phase(CalibPhase::Short, vec![Complex64::new(1.0, 0.0)]);
        set.set_phase(CalibPhase::Short, vec![Complex64::new(2.0, 0.0); 2]);

        assert_eq!(set.phase(CalibPhase::Short).len(), 2);
        assert_eq!(set.phase(CalibPhase::Short)[0].re, 2.0);
    }
}
