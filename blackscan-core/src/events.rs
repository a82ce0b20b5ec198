//! Consumer-facing events emitted during a batch run.
//!
//! This is the complete upward contract of the core: status transitions,
//! incremental detection batches, progress, and the final summary. Rendering,
//! export, and anything visual happens outside, consuming these events plus
//! the committed `FileOutcome` records.

use std::path::PathBuf;
use std::time::Duration;

use crate::parse::Detection;
use crate::processing::{BatchSummary, FileStatus};

#[derive(Debug, Clone)]
pub enum Event {
    BatchStarted {
        total_files: usize,
    },

    /// The metadata probe for a file has begun.
    FileProbeStarted {
        index: usize,
        total: usize,
        path: PathBuf,
    },

    /// The analysis process for a file is confirmed running.
    FileAnalysisStarted {
        index: usize,
        total: usize,
        path: PathBuf,
        /// Known duration in seconds; `None` means progress is indeterminate.
        duration_s: Option<f64>,
    },

    /// A bounded batch of newly parsed detections for the current file.
    DetectionBatch {
        path: PathBuf,
        detections: Vec<Detection>,
    },

    /// Updated completion fraction for the current analysis.
    AnalysisProgress {
        path: PathBuf,
        fraction: f64,
        eta: Option<Duration>,
    },

    /// A file reached a terminal status and its outcome was committed.
    FileCompleted {
        index: usize,
        total: usize,
        path: PathBuf,
        status: FileStatus,
        detections: usize,
        ranges: usize,
    },

    BatchCancelled {
        completed: usize,
        total: usize,
    },

    BatchFinished {
        summary: BatchSummary,
    },
}

/// Receiver for batch events. Implementations must be prepared to be called
/// from the orchestrator's thread at detection-stream rates.
pub trait EventHandler: Send + Sync {
    fn handle(&self, event: &Event);
}

/// No-op handler for tests and non-interactive callers.
#[derive(Debug, Clone, Default)]
pub struct NullEventHandler;

impl EventHandler for NullEventHandler {
    fn handle(&self, _event: &Event) {}
}
