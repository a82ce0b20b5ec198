//! Detection settings and external tool locations.
//!
//! The blackframe filter takes two tunables: an integer pixel-difference
//! threshold (how far from pure black a pixel may be) and a percentage of
//! the frame that must fall under that threshold. Standard catches
//! near-black frames; Strict only exact black.

use std::path::PathBuf;

use crate::error::{CoreError, CoreResult};

/// Practical default for most codecs; catches near-black frames.
pub const DEFAULT_BLACK_THRESHOLD: u8 = 32;
/// Default percentage of pixels that must be black.
pub const DEFAULT_BLACK_AMOUNT: f64 = 98.0;
/// Single black frames are reported by default.
pub const DEFAULT_MIN_RUN_FRAMES: usize = 1;

/// Named detection presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    /// Near-black detection (threshold 32, 98%).
    Standard,
    /// Exact black only (threshold 0, 100%).
    Strict,
}

impl DetectionMode {
    /// Resolves the preset to its `(threshold, amount)` pair.
    #[must_use]
    pub fn presets(self) -> (u8, f64) {
        match self {
            DetectionMode::Standard => (DEFAULT_BLACK_THRESHOLD, DEFAULT_BLACK_AMOUNT),
            DetectionMode::Strict => (0, 100.0),
        }
    }
}

/// Parameters controlling one analysis run.
#[derive(Debug, Clone)]
pub struct DetectionSettings {
    /// Pixel-difference threshold passed to the blackframe filter (0-50).
    pub threshold: u8,
    /// Percentage of the frame that must be black (90.0-100.0).
    pub amount: f64,
    /// Minimum consecutive-frame run length for a range to be reported.
    pub min_run_frames: usize,
    /// Whether to group detections into consecutive-frame ranges.
    pub build_ranges: bool,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self::from_mode(DetectionMode::Standard)
    }
}

impl DetectionSettings {
    /// Creates settings from a preset mode with default grouping behavior.
    #[must_use]
    pub fn from_mode(mode: DetectionMode) -> Self {
        let (threshold, amount) = mode.presets();
        Self {
            threshold,
            amount,
            min_run_frames: DEFAULT_MIN_RUN_FRAMES,
            build_ranges: true,
        }
    }

    /// Validates that all tunables are within the ranges the filter accepts.
    pub fn validate(&self) -> CoreResult<()> {
        if self.threshold > 50 {
            return Err(CoreError::Config(format!(
                "black threshold must be 0-50, got {}",
                self.threshold
            )));
        }
        if !(90.0..=100.0).contains(&self.amount) {
            return Err(CoreError::Config(format!(
                "black amount must be 90.0-100.0, got {}",
                self.amount
            )));
        }
        if self.min_run_frames == 0 {
            return Err(CoreError::Config(
                "minimum run length must be at least 1 frame".to_string(),
            ));
        }
        Ok(())
    }
}

/// Locations of the external tools driven by the core.
///
/// Defaults to PATH lookup; callers that bundle their own binaries resolve
/// the paths themselves and pass them in.
#[derive(Debug, Clone)]
pub struct ToolPaths {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}
