//! Terminal rendering of batch events.
//!
//! One progress bar exists at a time, for the file currently being analyzed:
//! a determinate bar when the probe reported a duration, a spinner otherwise.
//! Everything else is plain styled lines so the output reads well in logs.

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use blackscan_core::utils::format_timestamp;
use blackscan_core::{BatchSummary, Event, EventHandler};

/// Resolution of the determinate bar.
const BAR_UNITS: u64 = 1000;

struct FileState {
    bar: ProgressBar,
    detections: usize,
    eta: Option<Duration>,
}

pub struct ConsoleReporter {
    state: Mutex<Option<FileState>>,
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(None),
        }
    }

    fn state(&self) -> MutexGuard<'_, Option<FileState>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl EventHandler for ConsoleReporter {
    fn handle(&self, event: &Event) {
        match event {
            Event::BatchStarted { total_files } => {
                println!(
                    "{} {} file(s) queued",
                    style("Scanning").cyan().bold(),
                    total_files
                );
            }
            Event::FileProbeStarted { index, total, path } => {
                println!(
                    "{} [{}/{}] {}",
                    style("Probing").cyan(),
                    index + 1,
                    total,
                    path.display()
                );
            }
            Event::FileAnalysisStarted { duration_s, .. } => {
                let bar = match duration_s {
                    Some(_) => {
                        let bar = ProgressBar::new(BAR_UNITS);
                        bar.set_style(
                            ProgressStyle::with_template(
                                "  {bar:40.cyan/blue} {percent:>3}% {msg}",
                            )
                            .unwrap_or_else(|_| ProgressStyle::default_bar()),
                        );
                        bar
                    }
                    None => {
                        let bar = ProgressBar::new_spinner();
                        bar.set_style(
                            ProgressStyle::with_template("  {spinner} analyzing {msg}")
                                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                        );
                        bar.enable_steady_tick(Duration::from_millis(120));
                        bar
                    }
                };
                *self.state() = Some(FileState {
                    bar,
                    detections: 0,
                    eta: None,
                });
            }
            Event::DetectionBatch { detections, .. } => {
                if let Some(state) = self.state().as_mut() {
                    state.detections += detections.len();
                    let message = file_message(state);
                    state.bar.set_message(message);
                }
            }
            Event::AnalysisProgress { fraction, eta, .. } => {
                if let Some(state) = self.state().as_mut() {
                    state.eta = *eta;
                    state.bar.set_position((fraction * BAR_UNITS as f64) as u64);
                    let message = file_message(state);
                    state.bar.set_message(message);
                }
            }
            Event::FileCompleted {
                path,
                status,
                detections,
                ranges,
                ..
            } => {
                if let Some(state) = self.state().take() {
                    state.bar.finish_and_clear();
                }
                if status.is_failure() {
                    println!(
                        "  {} {}",
                        style(status.label()).red().bold(),
                        path.display()
                    );
                } else {
                    println!(
                        "  {} {} ({} black frames, {} ranges)",
                        style(status.label()).green(),
                        path.display(),
                        detections,
                        ranges
                    );
                }
            }
            Event::BatchCancelled { completed, total } => {
                if let Some(state) = self.state().take() {
                    state.bar.finish_and_clear();
                }
                println!(
                    "{} after {}/{} file(s)",
                    style("Cancelled").yellow().bold(),
                    completed,
                    total
                );
            }
            Event::BatchFinished { summary } => print_summary(summary),
        }
    }
}

fn file_message(state: &FileState) -> String {
    match state.eta {
        Some(eta) => format!(
            "{} black frames, ETA {}",
            state.detections,
            format_eta(eta)
        ),
        None => format!("{} black frames", state.detections),
    }
}

fn format_eta(eta: Duration) -> String {
    let secs = eta.as_secs();
    if secs >= 3600 {
        format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    } else {
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }
}

fn print_summary(summary: &BatchSummary) {
    println!();
    println!("{}", style("Summary").cyan().bold());
    println!(
        "  Files:      {}/{} completed",
        summary.completed_files, summary.total_files
    );
    println!("  Detections: {}", summary.total_detections);
    println!("  Ranges:     {}", summary.total_ranges);
    println!(
        "  Scanned:    {} of video in {:.1}s",
        format_timestamp(summary.total_duration_s),
        summary.elapsed.as_secs_f64()
    );
}
