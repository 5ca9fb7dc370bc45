//! Operator gating between calibration phases.

use std::io;

use lib_types::sweep::CalibPhase;

/// Consulted once before each calibration phase begins.
///
/// Calibration needs a fixture change between phases: short the leads,
/// open them, connect the reference load, connect the device under test.
/// An implementation may block until the operator confirms. The
/// controller only ever calls this seam, so holding for input is the
/// implementation's choice, and an error aborts the run.
pub trait PhaseGate {
    fn confirm(&mut self, phase: CalibPhase) -> io::Result<()>;
}

/// Proceeds through every phase without pausing.
#[derive(Clone, Copy, Debug, Default)]
pub struct AutoConfirm;

impl PhaseGate for AutoConfirm {
    fn confirm(&mut self, _phase: CalibPhase) -> io::Result<()> {
        Ok(())
    }
}

impl<G: PhaseGate + ?Sized> PhaseGate for Box<G> {
    fn confirm(&mut self, phase: CalibPhase) -> io::Result<()> {
        (**self).confirm(phase)
    }
}
