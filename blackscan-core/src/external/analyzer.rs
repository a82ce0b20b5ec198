//! Lifecycle of one ffmpeg blackframe analysis run.
//!
//! ffmpeg is configured to write `-progress` key/value events to stdout and
//! blackframe diagnostics to stderr. Each stream is pumped by its own reader
//! thread with its own `LineSplitter`; a chunk from one stream can never mix
//! with a partial line from the other. Typed events are multiplexed onto one
//! channel only after line assembly, so the caller can poll with a timeout
//! and stay responsive to cancellation.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::config::DetectionSettings;
use crate::error::{command_start_error, command_wait_error, CoreResult};
use crate::parse::{parse_blackframe_line, parse_progress_line, Detection, LineSplitter, ProgressLine};

/// A typed event parsed from one of the process streams.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzerEvent {
    /// One near-black frame reported by the filter.
    Detection(Detection),
    /// Elapsed output time in microseconds (from `out_time_ms`).
    Progress { out_time_us: u64 },
    /// ffmpeg signalled the end of its progress stream.
    ProgressEnd,
}

/// Result of polling the session for its next event.
#[derive(Debug)]
pub enum SessionPoll {
    Event(AnalyzerEvent),
    /// Nothing arrived within the timeout; the process is still running.
    Idle,
    /// Both streams have closed and their buffers were flushed; call
    /// [`AnalyzerSession::finish`] to collect the exit status.
    Finished,
}

/// An active ffmpeg analysis process.
pub struct AnalyzerSession {
    child: Child,
    events: Receiver<AnalyzerEvent>,
    pumps: Vec<JoinHandle<()>>,
}

impl AnalyzerSession {
    /// Spawns ffmpeg with the blackframe filter over `input`.
    ///
    /// A launch failure maps to `CoreError::CommandStart`; a process that
    /// starts and later exits nonzero is reported by [`finish`](Self::finish).
    pub fn spawn(ffmpeg: &Path, input: &Path, settings: &DetectionSettings) -> CoreResult<Self> {
        let filter = format!(
            "format=yuv420p,blackframe=amount={}:threshold={}",
            settings.amount, settings.threshold
        );

        let mut cmd = Command::new(ffmpeg);
        cmd.args(["-hide_banner", "-nostats", "-nostdin", "-loglevel", "info"])
            .arg("-i")
            .arg(input)
            .args(["-an", "-sn", "-dn"])
            .args(["-vf", &filter])
            .args(["-progress", "pipe:1"])
            .args(["-f", "null", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        log::debug!("Running analysis command: {cmd:?}");

        let mut child = cmd.spawn().map_err(|e| command_start_error("ffmpeg", e))?;

        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();
        let (tx, events) = mpsc::channel();
        let tx_err = tx.clone();

        // Progress key/value events arrive on stdout, detections on stderr.
        let pumps = vec![
            std::thread::spawn(move || pump_lines(stdout, &tx, parse_progress_event)),
            std::thread::spawn(move || pump_lines(stderr, &tx_err, parse_detection_event)),
        ];

        Ok(Self {
            child,
            events,
            pumps,
        })
    }

    /// Waits up to `timeout` for the next parsed event.
    pub fn poll(&self, timeout: Duration) -> SessionPoll {
        match self.events.recv_timeout(timeout) {
            Ok(event) => SessionPoll::Event(event),
            Err(RecvTimeoutError::Timeout) => SessionPoll::Idle,
            Err(RecvTimeoutError::Disconnected) => SessionPoll::Finished,
        }
    }

    /// Forcefully terminates the process. Used for cancellation; there is no
    /// graceful-shutdown handshake.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            log::debug!("Kill failed (process likely already exited): {e}");
        }
    }

    /// Joins the stream pumps and waits for the exit status.
    ///
    /// Joining first guarantees both splitters flushed their buffered final
    /// lines before the outcome of the run is decided.
    pub fn finish(mut self) -> CoreResult<ExitStatus> {
        for pump in self.pumps.drain(..) {
            let _ = pump.join();
        }
        self.child.wait().map_err(|e| command_wait_error("ffmpeg", e))
    }
}

fn parse_detection_event(line: &str) -> Option<AnalyzerEvent> {
    parse_blackframe_line(line).map(AnalyzerEvent::Detection)
}

fn parse_progress_event(line: &str) -> Option<AnalyzerEvent> {
    match parse_progress_line(line)? {
        ProgressLine::OutTime { out_time_us } => Some(AnalyzerEvent::Progress { out_time_us }),
        ProgressLine::End => Some(AnalyzerEvent::ProgressEnd),
    }
}

/// Reads raw chunks from one process stream, reassembles lines, and sends
/// whatever `parse` recognizes. Flushes the splitter's remainder as a final
/// partial line at EOF.
fn pump_lines<R: Read>(
    mut reader: R,
    tx: &Sender<AnalyzerEvent>,
    parse: fn(&str) -> Option<AnalyzerEvent>,
) {
    let mut splitter = LineSplitter::new();
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                let chunk = String::from_utf8_lossy(&buf[..n]);
                for line in splitter.feed(&chunk) {
                    if let Some(event) = parse(&line) {
                        if tx.send(event).is_err() {
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                log::debug!("Stream read ended: {e}");
                break;
            }
        }
    }
    if let Some(tail) = splitter.finish() {
        if let Some(event) = parse(&tail) {
            let _ = tx.send(event);
        }
    }
}
