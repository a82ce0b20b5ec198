//! Recognizers for the two line grammars in ffmpeg's output.
//!
//! Detection lines come from the blackframe filter on the diagnostic stream:
//!
//! ```text
//! [Parsed_blackframe_0 @ 0x7f8] frame:23 pblack:100 pts:27600 t:0.920000 type:I last_keyframe:0
//! ```
//!
//! Progress lines come from `-progress pipe:1` as `key=value` pairs. Any line
//! matching neither grammar is ignored; interleaved diagnostic text is normal.

use serde::Serialize;

/// Marker emitted by the blackframe filter on every detection line.
const BLACKFRAME_MARKER: &str = "Parsed_blackframe";

/// One reported near-black frame.
///
/// Only the frame index is guaranteed; the remaining fields are whatever the
/// filter happened to include on that line. A missing field stays `None` and
/// is never defaulted to zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    /// Frame index within the video stream.
    pub frame: u64,
    /// Presentation time in seconds (`t:`), if reported.
    pub time_s: Option<f64>,
    /// Percentage of pixels classified as black (`pblack:`), if reported.
    pub pblack: Option<f64>,
    /// Presentation timestamp in stream time base units (`pts:`), if reported.
    pub pts: Option<i64>,
}

/// Parses a blackframe detection line. Returns `None` for anything else.
#[must_use]
pub fn parse_blackframe_line(line: &str) -> Option<Detection> {
    let marker = line.find(BLACKFRAME_MARKER)?;
    let rest = &line[marker + BLACKFRAME_MARKER.len()..];

    let mut frame: Option<u64> = None;
    let mut time_s: Option<f64> = None;
    let mut pblack: Option<f64> = None;
    let mut pts: Option<i64> = None;

    // Each field parses independently; a malformed value leaves it absent.
    for token in rest.split_whitespace() {
        if let Some(value) = token.strip_prefix("frame:") {
            frame = frame.or_else(|| value.parse().ok());
        } else if let Some(value) = token.strip_prefix("pblack:") {
            pblack = pblack.or_else(|| value.parse().ok());
        } else if let Some(value) = token.strip_prefix("pts:") {
            pts = pts.or_else(|| value.parse().ok());
        } else if let Some(value) = token.strip_prefix("t:") {
            time_s = time_s.or_else(|| value.parse().ok());
        }
    }

    Some(Detection {
        frame: frame?,
        time_s,
        pblack,
        pts,
    })
}

/// A recognized `-progress` line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressLine {
    /// Elapsed output time. The field is named `out_time_ms`, but ffmpeg
    /// writes microseconds into it; the unit is kept as-is since the
    /// fraction math downstream depends on it.
    OutTime { out_time_us: u64 },
    /// End-of-stream marker (`progress=end`).
    End,
}

/// Parses a `-progress` key/value line. Returns `None` for anything else.
#[must_use]
pub fn parse_progress_line(line: &str) -> Option<ProgressLine> {
    let line = line.trim();
    if let Some(value) = line.strip_prefix("out_time_ms=") {
        return value
            .trim()
            .parse()
            .ok()
            .map(|out_time_us| ProgressLine::OutTime { out_time_us });
    }
    if line == "progress=end" {
        return Some(ProgressLine::End);
    }
    None
}
