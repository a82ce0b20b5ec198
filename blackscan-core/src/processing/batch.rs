//! Queue sequencing, per-file outcomes, and the batch result store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{DetectionSettings, ToolPaths};
use crate::error::{command_failed_error, CoreError, CoreResult};
use crate::events::{Event, EventHandler};
use crate::external::{AnalyzerEvent, AnalyzerSession, ProbeMetadata, ProbeSession, SessionPoll};
use crate::parse::Detection;
use crate::progress::ProgressEstimator;
use crate::ranges::{build_ranges, FrameRange};

/// How often buffered detections are handed to the consumer at the latest.
const FLUSH_INTERVAL: Duration = Duration::from_millis(150);
/// Upper bound on a single detection batch.
const FLUSH_BATCH: usize = 500;
/// Poll granularity; bounds how long a cancel request can go unobserved.
const POLL_TIMEOUT: Duration = Duration::from_millis(50);

/// Cloneable cancellation flag shared between the orchestrator and its
/// caller. Cancelling kills the active process and stops the queue.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Terminal and transitional states of one queued file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileStatus {
    Pending,
    Probing,
    Analyzing,
    Succeeded,
    FailedProbe,
    FailedStart,
    FailedExit,
    Cancelled,
}

impl FileStatus {
    /// Short user-facing label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Pending => "pending",
            FileStatus::Probing => "probing",
            FileStatus::Analyzing => "analyzing",
            FileStatus::Succeeded => "done",
            FileStatus::FailedProbe => "FAILED - probe",
            FileStatus::FailedStart => "FAILED - ffmpeg start",
            FileStatus::FailedExit => "FAILED",
            FileStatus::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            FileStatus::FailedProbe | FileStatus::FailedStart | FileStatus::FailedExit
        )
    }
}

/// The committed result of one queued file.
#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub status: FileStatus,
    /// Sorted by ascending frame index. Empty for failed files: a nonzero
    /// exit discards whatever was already streamed.
    pub detections: Vec<Detection>,
    pub ranges: Vec<FrameRange>,
}

/// Batch-lifetime aggregate of committed outcomes, in queue order.
///
/// Written only by the orchestrator between sessions; fully reset at the
/// start of every batch.
#[derive(Debug, Default)]
pub struct ResultStore {
    outcomes: Vec<FileOutcome>,
}

impl ResultStore {
    pub fn reset(&mut self) {
        self.outcomes.clear();
    }

    fn commit(&mut self, outcome: FileOutcome) {
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn outcome_for(&self, path: &Path) -> Option<&FileOutcome> {
        self.outcomes.iter().find(|o| o.path == path)
    }

    /// Detection count across committed outcomes. Failed files contribute
    /// nothing since their detections are discarded at commit time.
    #[must_use]
    pub fn total_detections(&self) -> usize {
        self.outcomes.iter().map(|o| o.detections.len()).sum()
    }

    #[must_use]
    pub fn total_ranges(&self) -> usize {
        self.outcomes.iter().map(|o| o.ranges.len()).sum()
    }
}

/// Final aggregate of one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total_files: usize,
    /// Files that reached a terminal status (succeeded or failed).
    pub completed_files: usize,
    pub total_detections: usize,
    pub total_ranges: usize,
    /// Sum of the known durations reported by successful probes, in seconds.
    pub total_duration_s: f64,
    pub elapsed: Duration,
    pub cancelled: bool,
}

/// Sequences probe and analysis runs across a list of files.
///
/// Strictly one external process is active at a time. A single file's
/// failure is converted into a failure outcome and the queue advances; no
/// per-file error ever escapes [`run`](Self::run).
pub struct QueueRunner {
    tools: ToolPaths,
    settings: DetectionSettings,
    store: ResultStore,
    cancel: CancelToken,
}

impl QueueRunner {
    #[must_use]
    pub fn new(tools: ToolPaths, settings: DetectionSettings) -> Self {
        Self {
            tools,
            settings,
            store: ResultStore::default(),
            cancel: CancelToken::new(),
        }
    }

    /// Token for requesting cancellation from another thread (for example a
    /// Ctrl-C handler).
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Outcomes committed by the most recent run, in queue order.
    #[must_use]
    pub fn outcomes(&self) -> &[FileOutcome] {
        self.store.outcomes()
    }

    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Processes `files` in order and returns the batch summary.
    ///
    /// All prior state is reset first; nothing carries over between batches.
    /// On cancellation, outcomes committed so far are retained and the
    /// interrupted file gets none.
    pub fn run(&mut self, files: &[PathBuf], handler: &dyn EventHandler) -> BatchSummary {
        self.store.reset();
        self.cancel.reset();

        let batch_start = Instant::now();
        let total = files.len();
        let mut total_duration_s = 0.0;
        let mut completed = 0usize;
        let mut cancelled = false;

        handler.handle(&Event::BatchStarted { total_files: total });

        for (index, path) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            handler.handle(&Event::FileProbeStarted {
                index,
                total,
                path: path.clone(),
            });

            let metadata = match self.probe_file(path) {
                Ok(Some(metadata)) => metadata,
                Ok(None) => {
                    // Cancelled mid-probe: the interrupted file gets no outcome.
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    // A cancel that raced the probe's own failure still wins.
                    if self.cancel.is_cancelled() {
                        cancelled = true;
                        break;
                    }
                    log::warn!("Probe failed for {}: {e}", path.display());
                    self.commit_failure(path, FileStatus::FailedProbe, index, total, handler);
                    completed += 1;
                    continue;
                }
            };
            if let Some(duration) = metadata.duration_s {
                total_duration_s += duration;
            }

            if self.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            match self.analyze_file(index, total, path, &metadata, handler) {
                Ok(Some(mut detections)) => {
                    detections.sort_by_key(|d| d.frame);
                    let ranges = if self.settings.build_ranges {
                        build_ranges(&detections, self.settings.min_run_frames)
                    } else {
                        Vec::new()
                    };
                    let detection_count = detections.len();
                    let range_count = ranges.len();
                    self.store.commit(FileOutcome {
                        path: path.clone(),
                        status: FileStatus::Succeeded,
                        detections,
                        ranges,
                    });
                    handler.handle(&Event::FileCompleted {
                        index,
                        total,
                        path: path.clone(),
                        status: FileStatus::Succeeded,
                        detections: detection_count,
                        ranges: range_count,
                    });
                    completed += 1;
                }
                Ok(None) => {
                    // Cancelled mid-analysis: partial state is discarded.
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    let status = match e {
                        CoreError::CommandStart(..) => FileStatus::FailedStart,
                        _ => FileStatus::FailedExit,
                    };
                    log::warn!("Analysis failed for {}: {e}", path.display());
                    self.commit_failure(path, status, index, total, handler);
                    completed += 1;
                }
            }
        }

        let summary = BatchSummary {
            total_files: total,
            completed_files: completed,
            total_detections: self.store.total_detections(),
            total_ranges: self.store.total_ranges(),
            total_duration_s,
            elapsed: batch_start.elapsed(),
            cancelled,
        };
        if cancelled {
            handler.handle(&Event::BatchCancelled {
                completed,
                total,
            });
        }
        handler.handle(&Event::BatchFinished {
            summary: summary.clone(),
        });
        summary
    }

    /// Runs one probe session to completion or cancellation.
    ///
    /// Returns `Ok(None)` when the run was cancelled; the in-flight probe is
    /// killed rather than waited out.
    fn probe_file(&self, path: &Path) -> CoreResult<Option<ProbeMetadata>> {
        let mut session = ProbeSession::spawn(&self.tools.ffprobe, path)?;
        loop {
            if self.cancel.is_cancelled() {
                session.kill();
                let _ = session.finish();
                return Ok(None);
            }
            if session.try_wait()?.is_some() {
                return session.finish().map(Some);
            }
            std::thread::sleep(POLL_TIMEOUT);
        }
    }

    /// Runs one analysis session to completion, cancellation, or failure.
    ///
    /// Returns `Ok(None)` when the run was cancelled. Detections are only
    /// final once the exit code is known and both stream remainders have
    /// been flushed, which [`AnalyzerSession::finish`] guarantees.
    fn analyze_file(
        &self,
        index: usize,
        total: usize,
        path: &Path,
        metadata: &ProbeMetadata,
        handler: &dyn EventHandler,
    ) -> CoreResult<Option<Vec<Detection>>> {
        let mut session = AnalyzerSession::spawn(&self.tools.ffmpeg, path, &self.settings)?;
        let estimator = ProgressEstimator::new(metadata.duration_s);
        handler.handle(&Event::FileAnalysisStarted {
            index,
            total,
            path: path.to_path_buf(),
            duration_s: metadata.duration_s,
        });

        let mut detections: Vec<Detection> = Vec::new();
        let mut pending: Vec<Detection> = Vec::new();
        let mut last_flush = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                session.kill();
                let _ = session.finish();
                return Ok(None);
            }

            match session.poll(POLL_TIMEOUT) {
                SessionPoll::Event(AnalyzerEvent::Detection(hit)) => pending.push(hit),
                SessionPoll::Event(AnalyzerEvent::Progress { out_time_us }) => {
                    if let Some(fraction) = estimator.fraction(out_time_us) {
                        handler.handle(&Event::AnalysisProgress {
                            path: path.to_path_buf(),
                            fraction,
                            eta: estimator.eta(fraction),
                        });
                    }
                }
                SessionPoll::Event(AnalyzerEvent::ProgressEnd) => {}
                SessionPoll::Idle => {}
                SessionPoll::Finished => break,
            }

            if pending.len() >= FLUSH_BATCH
                || (!pending.is_empty() && last_flush.elapsed() >= FLUSH_INTERVAL)
            {
                flush_pending(path, &mut pending, &mut detections, handler);
                last_flush = Instant::now();
            }
        }

        let status = session.finish()?;
        if !status.success() {
            // Policy: a failed run reports no partial results.
            return Err(command_failed_error(
                "ffmpeg",
                status,
                "analysis process exited with a nonzero status",
            ));
        }
        flush_pending(path, &mut pending, &mut detections, handler);
        Ok(Some(detections))
    }

    fn commit_failure(
        &mut self,
        path: &Path,
        status: FileStatus,
        index: usize,
        total: usize,
        handler: &dyn EventHandler,
    ) {
        self.store.commit(FileOutcome {
            path: path.to_path_buf(),
            status,
            detections: Vec::new(),
            ranges: Vec::new(),
        });
        handler.handle(&Event::FileCompleted {
            index,
            total,
            path: path.to_path_buf(),
            status,
            detections: 0,
            ranges: 0,
        });
    }
}

fn flush_pending(
    path: &Path,
    pending: &mut Vec<Detection>,
    collected: &mut Vec<Detection>,
    handler: &dyn EventHandler,
) {
    if pending.is_empty() {
        return;
    }
    let batch = std::mem::take(pending);
    collected.extend(batch.iter().cloned());
    handler.handle(&Event::DetectionBatch {
        path: path.to_path_buf(),
        detections: batch,
    });
}
