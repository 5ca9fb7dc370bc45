//! Progress reporting for long-running sweeps.

use std::path::PathBuf;

/// Receives the completion percentage as a sweep phase advances.
///
/// The controller reports once per completed cycle. Values ramp from just
/// above zero to exactly 100 within each calibration phase, then restart
/// for the next phase. Reports are best-effort; a sink must not fail the
/// sweep.
pub trait ProgressSink {
    fn report(&mut self, percent: u8);
}

/// Discards every report.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Logs each report. Keeps the ramp visible in headless runs, standing in
/// for the front-panel LED the instrument dims as a sweep progresses.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&mut self, percent: u8) {
        tracing::debug!(percent, "sweep progress");
    }
}

/// Overwrites a file with the latest percentage, for external pollers.
/// Write failures are logged and dropped, never escalated.
#[derive(Clone, Debug)]
pub struct FileProgress {
    path: PathBuf,
}

impl FileProgress {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ProgressSink for FileProgress {
    fn report(&mut self, percent: u8) {
        if let Err(e) = std::fs::write(&self.path, format!("{percent}\n")) {
            tracing::warn!("Failed to write progress file {:?}: {}", self.path, e);
        }
    }
}
