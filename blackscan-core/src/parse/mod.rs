//! Incremental parsing of ffmpeg's raw output streams.
//!
//! ffmpeg delivers its diagnostics in arbitrary-sized chunks, not whole
//! lines. `splitter` reassembles complete lines across chunk boundaries;
//! `events` recognizes the two line grammars blackscan cares about
//! (blackframe detection reports and `-progress` key/value lines).

pub mod events;
pub mod splitter;

pub use events::{parse_blackframe_line, parse_progress_line, Detection, ProgressLine};
pub use splitter::LineSplitter;
