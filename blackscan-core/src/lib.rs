//! Core library for blackscan.
//!
//! blackscan drives ffmpeg's `blackframe` filter over a queue of video files
//! to locate near-black frames, parsing the filter's diagnostic lines and the
//! `-progress` key/value stream as they arrive. The library is UI-agnostic:
//! callers receive typed [`events::Event`] values through an
//! [`events::EventHandler`] and read committed per-file results from the
//! orchestrator's [`processing::ResultStore`].
//!
//! The main entry point is [`processing::QueueRunner`], which sequences a
//! metadata probe (ffprobe) and an analysis run (ffmpeg) per file, one
//! external process at a time.

pub mod config;
pub mod discovery;
pub mod error;
pub mod events;
pub mod external;
pub mod parse;
pub mod processing;
pub mod progress;
pub mod ranges;
pub mod utils;

pub use config::{DetectionMode, DetectionSettings, ToolPaths};
pub use discovery::collect_video_files;
pub use error::{CoreError, CoreResult};
pub use events::{Event, EventHandler, NullEventHandler};
pub use external::{check_dependency, probe_media, AnalyzerSession, ProbeMetadata, ProbeSession};
pub use parse::{Detection, LineSplitter};
pub use processing::{
    BatchSummary, CancelToken, FileOutcome, FileStatus, QueueRunner, ResultStore,
};
pub use progress::ProgressEstimator;
pub use ranges::{build_ranges, FrameRange};
