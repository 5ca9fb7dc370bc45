//! # lib-dsp
//!
//! Numerical core for the LCR meter controller:
//!
//! - **Synthesis**: stimulus waveform tables and generator register values
//! - **Lock-in**: quadrature extraction of voltage/current phasors and the
//!   complex impedance they imply
//! - **Compensation**: open/short/load calibration algebra
//! - **Sweep planning**: step frequencies, decimation bands, capture sizing
//!   and the warm-up schedule

pub mod error;
pub mod synthesis;
pub mod lockin;
pub mod compensation;
pub mod sweep;

pub use error::{DspError, DspResult};
pub use sweep::{SweepPlan, SweepStep};
