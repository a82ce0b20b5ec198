//! Utility functions for formatting timestamps.

/// Formats seconds as HH:MM:SS.mmm (e.g., 3725.5 -> "01:02:05.500").
/// Returns "??:??:??.???" for invalid inputs.
#[must_use]
pub fn format_timestamp(seconds: f64) -> String {
    if seconds < 0.0 || !seconds.is_finite() {
        return "??:??:??.???".to_string();
    }

    let total_ms = (seconds * 1000.0).round() as u64;
    let total_seconds = total_ms / 1000;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{secs:02}.{millis:03}")
}

/// Formats an optional timestamp, printing "n/a" when absent.
#[must_use]
pub fn format_optional_timestamp(seconds: Option<f64>) -> String {
    seconds.map_or_else(|| "n/a".to_string(), format_timestamp)
}
