//! CSV and JSON export of committed batch results.
//!
//! Exports are flat row tables, one row per detection or per range, with the
//! source file repeated in every row so the output loads directly into
//! spreadsheets and dataframes. Failed files contribute no rows.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;

use blackscan_core::utils::format_optional_timestamp;
use blackscan_core::{CoreResult, FileOutcome};

#[derive(Debug, Serialize)]
struct FrameRow {
    file: String,
    frame: u64,
    time_s: Option<f64>,
    timestamp: String,
    pblack: Option<f64>,
    pts: Option<i64>,
}

#[derive(Debug, Serialize)]
struct RangeRow {
    file: String,
    start_frame: u64,
    end_frame: u64,
    start_timestamp: String,
    end_timestamp: String,
    length_frames: u64,
    avg_pblack: Option<f64>,
    min_pblack: Option<f64>,
}

fn frame_rows(outcomes: &[FileOutcome]) -> Vec<FrameRow> {
    outcomes
        .iter()
        .flat_map(|outcome| {
            let file = outcome.path.display().to_string();
            outcome.detections.iter().map(move |d| FrameRow {
                file: file.clone(),
                frame: d.frame,
                time_s: d.time_s,
                timestamp: format_optional_timestamp(d.time_s),
                pblack: d.pblack,
                pts: d.pts,
            })
        })
        .collect()
}

fn range_rows(outcomes: &[FileOutcome]) -> Vec<RangeRow> {
    outcomes
        .iter()
        .flat_map(|outcome| {
            let file = outcome.path.display().to_string();
            outcome.ranges.iter().map(move |r| RangeRow {
                file: file.clone(),
                start_frame: r.start_frame,
                end_frame: r.end_frame,
                start_timestamp: format_optional_timestamp(r.start_time_s),
                end_timestamp: format_optional_timestamp(r.end_time_s),
                length_frames: r.length_frames,
                avg_pblack: r.avg_pblack,
                min_pblack: r.min_pblack,
            })
        })
        .collect()
}

pub fn write_frames_csv(path: &Path, outcomes: &[FileOutcome]) -> CoreResult<()> {
    let mut out = String::from("file,frame,time_s,timestamp,pblack,pts\n");
    for row in frame_rows(outcomes) {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            csv_field(&row.file),
            row.frame,
            opt_field(row.time_s),
            row.timestamp,
            opt_field(row.pblack),
            row.pts.map_or_else(String::new, |p| p.to_string()),
        ));
    }
    fs::write(path, out)?;
    Ok(())
}

pub fn write_ranges_csv(path: &Path, outcomes: &[FileOutcome]) -> CoreResult<()> {
    let mut out = String::from(
        "file,start_frame,end_frame,start_timestamp,end_timestamp,length_frames,avg_pblack,min_pblack\n",
    );
    for row in range_rows(outcomes) {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}\n",
            csv_field(&row.file),
            row.start_frame,
            row.end_frame,
            row.start_timestamp,
            row.end_timestamp,
            row.length_frames,
            opt_field(row.avg_pblack),
            opt_field(row.min_pblack),
        ));
    }
    fs::write(path, out)?;
    Ok(())
}

pub fn write_frames_json(path: &Path, outcomes: &[FileOutcome]) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(&frame_rows(outcomes)).map_err(io::Error::from)?;
    fs::write(path, json)?;
    Ok(())
}

pub fn write_ranges_json(path: &Path, outcomes: &[FileOutcome]) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(&range_rows(outcomes)).map_err(io::Error::from)?;
    fs::write(path, json)?;
    Ok(())
}

fn opt_field(value: Option<f64>) -> String {
    value.map_or_else(String::new, |v| v.to_string())
}

/// Quotes a CSV field when it contains a delimiter, quote, or newline.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
