//! ffprobe integration for the per-file metadata probe step.
//!
//! The probe extracts container duration and frame rate ahead of analysis so
//! progress can be computed as a fraction. Everything about the report is
//! treated as optional: a missing duration, a `0/0` frame rate, or malformed
//! JSON all degrade to unknown metadata and analysis proceeds in
//! indeterminate-progress mode. Only a probe that cannot be started, or that
//! produces no output at all, is a failure for the file.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use serde::Deserialize;

use crate::error::{
    command_failed_error, command_start_error, command_wait_error, CoreResult,
};

/// Metadata extracted by the probe step. Consumed immediately to
/// parameterize the analysis run, then discarded.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ProbeMetadata {
    /// Container duration in seconds, if reported and parseable.
    pub duration_s: Option<f64>,
    /// Frames per second, if the reported rational had a nonzero denominator.
    pub frame_rate: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeReport {
    #[serde(default)]
    format: ProbeFormat,
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProbeStream {
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
}

/// An active ffprobe process.
///
/// Output is drained by background threads, so the caller can poll
/// [`try_wait`](Self::try_wait) and [`kill`](Self::kill) an in-flight probe
/// at any time without a pipe filling up and stalling the process.
pub struct ProbeSession {
    child: Child,
    input: PathBuf,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl ProbeSession {
    /// Spawns ffprobe against `input`. A launch failure maps to
    /// `CoreError::CommandStart`.
    pub fn spawn(ffprobe: &Path, input: &Path) -> CoreResult<Self> {
        log::debug!("Running ffprobe on: {}", input.display());

        let mut child = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "format=duration:stream=avg_frame_rate,r_frame_rate",
                "-of",
                "json",
            ])
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| command_start_error("ffprobe", e))?;

        let stdout = child.stdout.take().unwrap();
        let stderr = child.stderr.take().unwrap();
        Ok(Self {
            child,
            input: input.to_path_buf(),
            stdout: Some(std::thread::spawn(move || drain(stdout))),
            stderr: Some(std::thread::spawn(move || drain(stderr))),
        })
    }

    /// Nonblocking exit check.
    pub fn try_wait(&mut self) -> CoreResult<Option<ExitStatus>> {
        self.child
            .try_wait()
            .map_err(|e| command_wait_error("ffprobe", e))
    }

    /// Forcefully terminates the probe. Used for cancellation.
    pub fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            log::debug!("Kill failed (process likely already exited): {e}");
        }
    }

    /// Waits for the exit status, collects the report, and extracts the
    /// metadata.
    ///
    /// Errors only when the process wrote nothing to stdout; every parse
    /// problem degrades to `None` fields.
    pub fn finish(mut self) -> CoreResult<ProbeMetadata> {
        let status = self
            .child
            .wait()
            .map_err(|e| command_wait_error("ffprobe", e))?;

        let stdout = join_output(self.stdout.take());
        let report = String::from_utf8_lossy(&stdout);
        let report = report.trim();
        if report.is_empty() {
            let stderr = join_output(self.stderr.take());
            let stderr = String::from_utf8_lossy(&stderr).into_owned();
            log::error!(
                "ffprobe produced no usable output for {}: {}",
                self.input.display(),
                stderr.trim()
            );
            return Err(command_failed_error("ffprobe", status, stderr));
        }

        Ok(parse_probe_report(report))
    }
}

fn drain(mut reader: impl Read) -> Vec<u8> {
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf);
    buf
}

fn join_output(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Runs ffprobe to completion and extracts duration and frame rate.
///
/// Convenience wrapper over [`ProbeSession`] for callers without a
/// cancellation path.
pub fn probe_media(ffprobe: &Path, input: &Path) -> CoreResult<ProbeMetadata> {
    ProbeSession::spawn(ffprobe, input)?.finish()
}

fn parse_probe_report(report: &str) -> ProbeMetadata {
    let parsed: ProbeReport = match serde_json::from_str(report) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Failed to parse ffprobe report, metadata unknown: {e}");
            return ProbeMetadata::default();
        }
    };

    let duration_s = parsed
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite());

    let frame_rate = parsed.streams.first().and_then(|stream| {
        stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_frame_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_frame_rate))
    });

    ProbeMetadata {
        duration_s,
        frame_rate,
    }
}

/// Parses a rational `num/den` frame rate string.
///
/// A zero denominator means the rate is undefined, not zero.
#[must_use]
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let (num, den) = rate.split_once('/')?;
    let num: f64 = num.trim().parse().ok()?;
    let den: f64 = den.trim().parse().ok()?;
    if den == 0.0 || !num.is_finite() || !den.is_finite() {
        return None;
    }
    Some(num / den)
}
