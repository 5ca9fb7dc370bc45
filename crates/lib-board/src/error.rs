//! Error types for board driver operations.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while driving the acquisition board.
#[derive(Debug, Error)]
pub enum BoardError {
    /// Board bring-up failed.
    #[error("board initialization failed: {0}")]
    InitFailed(String),

    /// Operation issued before the board was brought up.
    #[error("board not initialized: {operation} requires init() first")]
    NotInitialized { operation: &'static str },

    /// Driver rejected the acquisition parameters.
    #[error("driver rejected acquisition parameters: {0}")]
    InvalidParameters(String),

    /// Generator rejected the stimulus write.
    #[error("stimulus write failed on channel {channel}: {reason}")]
    StimulusRejected { channel: usize, reason: String },

    /// Trigger never completed within the retry budget.
    #[error("acquisition timed out after {attempts} polls over {waited:?}")]
    AcquisitionTimeout { attempts: u32, waited: Duration },

    /// Driver handed back fewer samples than requested.
    #[error("short read: requested {requested} samples, got {got}")]
    ShortRead { requested: usize, got: usize },
}

impl BoardError {
    /// Whether retrying the same operation can reasonably succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AcquisitionTimeout { .. } | Self::ShortRead { .. }
        )
    }
}

/// Result type for board operations.
pub type BoardResult<T> = Result<T, BoardError>;
