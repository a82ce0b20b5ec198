//! End-to-end batch runs against stub ffmpeg/ffprobe executables.
//!
//! The stubs are small shell scripts that replay the tools' output shapes:
//! `-progress` key/value lines on stdout, blackframe diagnostics on stderr,
//! and exit codes keyed off the input file name.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Sender};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use blackscan_core::{
    DetectionSettings, Event, EventHandler, FileStatus, QueueRunner, ToolPaths,
};

const FFPROBE_STUB: &str = r#"#!/bin/sh
input=""
for a in "$@"; do input="$a"; done
case "$input" in
    *noprobe*) exit 1 ;;
    *slowprobe*) exec sleep 30 ;;
esac
printf '{"streams":[{"avg_frame_rate":"25/1","r_frame_rate":"25/1"}],"format":{"duration":"1.0"}}\n'
"#;

const FFMPEG_STUB: &str = r#"#!/bin/sh
prev=""
input=""
for a in "$@"; do
    if [ "$prev" = "-i" ]; then input="$a"; fi
    prev="$a"
done
case "$input" in
    *slow*) exec sleep 30 ;;
esac
printf 'out_time_ms=500000\nprogress=continue\n'
printf '[Parsed_blackframe_0 @ 0x55] frame:10 pblack:99 pts:100 t:0.4 type:P last_keyframe:0\n' >&2
case "$input" in
    *bad*)
        printf 'Error while decoding stream\n' >&2
        exit 1
        ;;
esac
printf 'out_time_ms=1000000\nprogress=end\n'
printf '[Parsed_blackframe_0 @ 0x55] frame:11 pblack:100 pts:110 t:0.44' >&2
exit 0
"#;

fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn stub_tools(dir: &Path) -> ToolPaths {
    ToolPaths {
        ffmpeg: write_stub(dir, "ffmpeg-stub", FFMPEG_STUB),
        ffprobe: write_stub(dir, "ffprobe-stub", FFPROBE_STUB),
    }
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
    completions: Mutex<Option<Sender<()>>>,
    probe_starts: Mutex<Option<Sender<()>>>,
}

impl EventHandler for Recorder {
    fn handle(&self, event: &Event) {
        if matches!(event, Event::FileCompleted { .. }) {
            if let Some(tx) = &*self.completions.lock().unwrap() {
                let _ = tx.send(());
            }
        }
        if matches!(event, Event::FileProbeStarted { .. }) {
            if let Some(tx) = &*self.probe_starts.lock().unwrap() {
                let _ = tx.send(());
            }
        }
        self.events.lock().unwrap().push(event.clone());
    }
}

#[test]
fn batch_advances_past_failed_file() {
    let dir = tempfile::tempdir().unwrap();
    let tools = stub_tools(dir.path());
    let files = vec![
        dir.path().join("a.mp4"),
        dir.path().join("bad.mp4"),
        dir.path().join("c.mp4"),
    ];

    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    let recorder = Recorder::default();
    let summary = runner.run(&files, &recorder);

    assert!(!summary.cancelled);
    assert_eq!(summary.total_files, 3);
    assert_eq!(summary.completed_files, 3);
    assert!((summary.total_duration_s - 3.0).abs() < 1e-9);

    let outcomes = runner.outcomes();
    assert_eq!(outcomes.len(), 3);
    assert_eq!(outcomes[0].status, FileStatus::Succeeded);
    assert_eq!(outcomes[1].status, FileStatus::FailedExit);
    assert_eq!(outcomes[2].status, FileStatus::Succeeded);

    // The final detection line has no trailing newline; it must still be
    // flushed when the stream closes.
    let frames: Vec<u64> = outcomes[0].detections.iter().map(|d| d.frame).collect();
    assert_eq!(frames, vec![10, 11]);
    assert_eq!(outcomes[0].ranges.len(), 1);
    assert_eq!(outcomes[0].ranges[0].length_frames, 2);

    // A nonzero exit discards detections that were already streamed.
    assert!(outcomes[1].detections.is_empty());
    assert_eq!(summary.total_detections, 4);
    assert_eq!(summary.total_ranges, 2);

    let events = recorder.events.lock().unwrap();
    assert!(matches!(events.first(), Some(Event::BatchStarted { total_files: 3 })));
    assert!(matches!(events.last(), Some(Event::BatchFinished { .. })));
    assert!(events.iter().any(|e| matches!(e, Event::DetectionBatch { .. })));
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::AnalysisProgress { fraction, .. } if (*fraction - 0.5).abs() < 1e-9)));
}

#[test]
fn probe_failure_marks_file_and_advances() {
    let dir = tempfile::tempdir().unwrap();
    let tools = stub_tools(dir.path());
    let files = vec![dir.path().join("noprobe.mp4"), dir.path().join("a.mp4")];

    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    let summary = runner.run(&files, &blackscan_core::NullEventHandler);

    assert_eq!(summary.completed_files, 2);
    let outcomes = runner.outcomes();
    assert_eq!(outcomes[0].status, FileStatus::FailedProbe);
    assert!(outcomes[0].detections.is_empty());
    assert_eq!(outcomes[1].status, FileStatus::Succeeded);
}

#[test]
fn missing_tools_fail_per_file_without_halting() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![dir.path().join("a.mp4"), dir.path().join("b.mp4")];

    // ffprobe missing entirely.
    let tools = ToolPaths {
        ffmpeg: write_stub(dir.path(), "ffmpeg-stub", FFMPEG_STUB),
        ffprobe: dir.path().join("no-such-ffprobe"),
    };
    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    runner.run(&files, &blackscan_core::NullEventHandler);
    assert!(runner
        .outcomes()
        .iter()
        .all(|o| o.status == FileStatus::FailedProbe));

    // ffprobe fine, ffmpeg missing.
    let tools = ToolPaths {
        ffmpeg: dir.path().join("no-such-ffmpeg"),
        ffprobe: write_stub(dir.path(), "ffprobe-stub", FFPROBE_STUB),
    };
    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    runner.run(&files, &blackscan_core::NullEventHandler);
    assert_eq!(runner.outcomes().len(), 2);
    assert!(runner
        .outcomes()
        .iter()
        .all(|o| o.status == FileStatus::FailedStart));
}

#[test]
fn cancel_kills_active_process_and_keeps_committed_outcomes() {
    let dir = tempfile::tempdir().unwrap();
    let tools = stub_tools(dir.path());
    let files = vec![
        dir.path().join("a.mp4"),
        dir.path().join("slow.mp4"),
        dir.path().join("c.mp4"),
    ];

    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    let token = runner.cancel_token();
    let (tx, rx) = channel();
    let recorder = Recorder {
        completions: Mutex::new(Some(tx)),
        ..Recorder::default()
    };

    let summary = std::thread::scope(|s| {
        let handle = s.spawn(|| runner.run(&files, &recorder));
        // Wait until the first file has committed, then cancel during the
        // long-running second file.
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        token.cancel();
        handle.join().unwrap()
    });

    assert!(summary.cancelled);
    assert_eq!(summary.completed_files, 1);

    let outcomes = runner.outcomes();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].status, FileStatus::Succeeded);
    assert!(outcomes[0].path.ends_with("a.mp4"));

    let events = recorder.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::BatchCancelled { completed: 1, total: 3 })));
}

#[test]
fn cancel_during_probe_kills_probe_and_commits_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let tools = stub_tools(dir.path());
    let files = vec![
        dir.path().join("slowprobe.mp4"),
        dir.path().join("b.mp4"),
    ];

    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    let token = runner.cancel_token();
    let (tx, rx) = channel();
    let recorder = Recorder {
        probe_starts: Mutex::new(Some(tx)),
        ..Recorder::default()
    };

    let start = Instant::now();
    let summary = std::thread::scope(|s| {
        let handle = s.spawn(|| runner.run(&files, &recorder));
        // Cancel while the first file's probe is still running.
        rx.recv_timeout(Duration::from_secs(10)).unwrap();
        token.cancel();
        handle.join().unwrap()
    });

    // The sleeping probe is killed, not waited out.
    assert!(start.elapsed() < Duration::from_secs(10));
    assert!(summary.cancelled);
    assert_eq!(summary.completed_files, 0);
    assert!(runner.outcomes().is_empty());

    let events = recorder.events.lock().unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, Event::BatchCancelled { completed: 0, total: 2 })));
    assert!(!events.iter().any(|e| matches!(e, Event::FileCompleted { .. })));
}

#[test]
fn rerun_resets_previous_results() {
    let dir = tempfile::tempdir().unwrap();
    let tools = stub_tools(dir.path());
    let files = vec![dir.path().join("a.mp4")];

    let mut runner = QueueRunner::new(tools, DetectionSettings::default());
    runner.run(&files, &blackscan_core::NullEventHandler);
    runner.run(&files, &blackscan_core::NullEventHandler);

    // Results do not accumulate across batches.
    assert_eq!(runner.outcomes().len(), 1);
    assert_eq!(runner.store().total_detections(), 2);
}
