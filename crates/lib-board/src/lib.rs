//! # lib-board
//!
//! Driver surface for the signal generation/acquisition board.
//!
//! This crate defines the contract the sweep controller runs against:
//!
//! - [`Board`]: init, input-chain configuration, stimulus writes, blocking
//!   capture
//! - [`BoardTiming`]: the settle/poll/recovery budget of the blocking path
//! - [`ProgressSink`]: per-cycle completion reporting
//! - [`PhaseGate`]: operator confirmation before each calibration phase
//! - [`sim::SimulatedBoard`]: in-memory implementation rendering ideal
//!   front-end captures for configurable loads, with failure injection

pub mod error;
pub mod board;
pub mod gate;
pub mod progress;
pub mod sim;

pub use board::{AcquisitionParams, Board, BoardTiming};
pub use error::{BoardError, BoardResult};
pub use gate::{AutoConfirm, PhaseGate};
pub use progress::{FileProgress, LogProgress, NullProgress, ProgressSink};
pub use sim::{LoadModel, SimulatedBoard};
