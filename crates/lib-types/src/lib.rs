//! # lib-types
//!
//! Core type definitions for the LCR meter workspace.
//!
//! This crate provides foundational types used throughout the workspace:
//! - Physical units with compile-time safety
//! - Fixed board characteristics and decimation bands
//! - Signal buffers crossing the hardware boundary
//! - Complex impedance and its derived parameter family
//! - Sweep and calibration vocabulary

pub mod units;
pub mod device;
pub mod signal;
pub mod impedance;
pub mod sweep;

pub use units::*;
pub use device::*;
pub use signal::*;
pub use impedance::*;
pub use sweep::*;

/// Re-export num_complex for convenience
pub use num_complex::Complex64;
