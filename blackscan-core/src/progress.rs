//! Completion fraction and ETA estimation for a running analysis.

use std::time::{Duration, Instant};

/// Short elapsed samples make the projected total wildly inaccurate, so the
/// ETA is withheld until this much wall-clock time has passed.
const ETA_WARMUP: Duration = Duration::from_millis(500);

/// Converts elapsed output time plus the known duration into a completion
/// fraction and a time-remaining estimate.
///
/// Created when the analyze process is confirmed started; the wall clock is
/// sampled once at that point.
#[derive(Debug)]
pub struct ProgressEstimator {
    started: Instant,
    duration_s: Option<f64>,
}

impl ProgressEstimator {
    /// Non-positive or non-finite durations are treated as unknown.
    #[must_use]
    pub fn new(duration_s: Option<f64>) -> Self {
        Self {
            started: Instant::now(),
            duration_s: duration_s.filter(|d| d.is_finite() && *d > 0.0),
        }
    }

    /// Whether a completion fraction can be computed at all.
    #[must_use]
    pub fn is_determinate(&self) -> bool {
        self.duration_s.is_some()
    }

    /// Completion fraction in [0, 1] for an elapsed output time in
    /// microseconds, or `None` when the duration is unknown (callers fall
    /// back to an indeterminate indicator).
    #[must_use]
    pub fn fraction(&self, out_time_us: u64) -> Option<f64> {
        let duration_us = self.duration_s? * 1_000_000.0;
        Some((out_time_us as f64 / duration_us).clamp(0.0, 1.0))
    }

    /// Estimated time remaining, or `None` while no reliable estimate exists.
    #[must_use]
    pub fn eta(&self, fraction: f64) -> Option<Duration> {
        remaining_after(fraction, self.started.elapsed())
    }
}

fn remaining_after(fraction: f64, elapsed: Duration) -> Option<Duration> {
    if fraction <= 0.0 || elapsed < ETA_WARMUP {
        return None;
    }
    let elapsed_s = elapsed.as_secs_f64();
    let estimated_total = elapsed_s / fraction;
    Some(Duration::from_secs_f64((estimated_total - elapsed_s).max(0.0)))
}
