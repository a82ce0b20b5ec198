//! Interactions with the external ffmpeg and ffprobe tools.
//!
//! The core never inspects pixel data itself; it drives the tools as child
//! processes and interprets their textual reports. `ffprobe` covers the
//! metadata probe step, `analyzer` owns the lifecycle of one blackframe
//! analysis run.

use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{CoreError, CoreResult};

pub mod analyzer;
pub mod ffprobe;

pub use analyzer::{AnalyzerEvent, AnalyzerSession, SessionPoll};
pub use ffprobe::{probe_media, ProbeMetadata, ProbeSession};

/// Checks that a required external command is available and executable by
/// running it with `-version`.
pub fn check_dependency(cmd: &Path) -> CoreResult<()> {
    let result = Command::new(cmd)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd.display());
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd.display());
            Err(CoreError::DependencyNotFound(
                cmd.display().to_string(),
            ))
        }
        Err(e) => {
            log::error!(
                "Failed to start dependency check command '{}': {}",
                cmd.display(),
                e
            );
            Err(CoreError::CommandStart(cmd.display().to_string(), e))
        }
    }
}
