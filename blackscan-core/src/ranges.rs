//! Grouping of scattered per-frame detections into contiguous ranges.

use serde::Serialize;

use crate::parse::Detection;

/// A maximal run of consecutive detected frames meeting the minimum-length
/// policy. Derived from an ordered run of detections; never mutated after
/// construction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameRange {
    pub start_frame: u64,
    pub end_frame: u64,
    /// Time of the first detection in the run, if it reported one.
    pub start_time_s: Option<f64>,
    /// Time of the last detection in the run, if it reported one.
    pub end_time_s: Option<f64>,
    /// Always `end_frame - start_frame + 1`.
    pub length_frames: u64,
    /// Mean of the blackness values present in the run; absent if none.
    pub avg_pblack: Option<f64>,
    /// Minimum of the blackness values present in the run; absent if none.
    pub min_pblack: Option<f64>,
}

/// Groups detections into maximal runs of consecutive frame numbers and
/// keeps runs of at least `min_run_frames` frames.
///
/// O(n log n) from the sort, one linear pass thereafter. Empty input yields
/// an empty list.
#[must_use]
pub fn build_ranges(detections: &[Detection], min_run_frames: usize) -> Vec<FrameRange> {
    if detections.is_empty() {
        return Vec::new();
    }

    let mut sorted: Vec<&Detection> = detections.iter().collect();
    sorted.sort_by_key(|d| d.frame);

    let mut ranges = Vec::new();
    let mut run: Vec<&Detection> = vec![sorted[0]];

    for hit in &sorted[1..] {
        let prev = run[run.len() - 1];
        if hit.frame == prev.frame + 1 {
            run.push(hit);
        } else {
            if let Some(range) = finalize_run(&run, min_run_frames) {
                ranges.push(range);
            }
            run = vec![hit];
        }
    }
    if let Some(range) = finalize_run(&run, min_run_frames) {
        ranges.push(range);
    }

    ranges
}

fn finalize_run(run: &[&Detection], min_run_frames: usize) -> Option<FrameRange> {
    let start = run.first()?;
    let end = run[run.len() - 1];
    let length = end.frame - start.frame + 1;
    if (length as usize) < min_run_frames {
        return None;
    }

    let pvals: Vec<f64> = run.iter().filter_map(|h| h.pblack).collect();
    let avg_pblack = if pvals.is_empty() {
        None
    } else {
        Some(pvals.iter().sum::<f64>() / pvals.len() as f64)
    };
    let min_pblack = pvals.iter().copied().reduce(f64::min);

    Some(FrameRange {
        start_frame: start.frame,
        end_frame: end.frame,
        start_time_s: start.time_s,
        end_time_s: end.time_s,
        length_frames: length,
        avg_pblack,
        min_pblack,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(frame: u64, pblack: Option<f64>) -> Detection {
        Detection {
            frame,
            time_s: Some(frame as f64 / 25.0),
            pblack,
            pts: None,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(build_ranges(&[], 1).is_empty());
    }

    #[test]
    fn test_two_runs_min_run_one() {
        let hits: Vec<Detection> = [10, 11, 12, 15, 16]
            .iter()
            .map(|&f| hit(f, Some(100.0)))
            .collect();
        let ranges = build_ranges(&hits, 1);
        assert_eq!(ranges.len(), 2);
        assert_eq!((ranges[0].start_frame, ranges[0].end_frame), (10, 12));
        assert_eq!(ranges[0].length_frames, 3);
        assert_eq!((ranges[1].start_frame, ranges[1].end_frame), (15, 16));
        assert_eq!(ranges[1].length_frames, 2);
    }

    #[test]
    fn test_min_run_filters_short_runs() {
        let hits: Vec<Detection> = [10, 11, 12, 15, 16]
            .iter()
            .map(|&f| hit(f, Some(100.0)))
            .collect();
        let ranges = build_ranges(&hits, 3);
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].start_frame, ranges[0].end_frame), (10, 12));
    }

    #[test]
    fn test_single_frame_range_allowed_at_min_run_one() {
        let ranges = build_ranges(&[hit(42, Some(99.0))], 1);
        assert_eq!(ranges.len(), 1);
        assert_eq!(ranges[0].length_frames, 1);
        assert_eq!(ranges[0].start_frame, ranges[0].end_frame);
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let hits = vec![hit(12, None), hit(10, None), hit(11, None)];
        let ranges = build_ranges(&hits, 1);
        assert_eq!(ranges.len(), 1);
        assert_eq!((ranges[0].start_frame, ranges[0].end_frame), (10, 12));
    }

    #[test]
    fn test_blackness_statistics() {
        let hits = vec![
            hit(1, Some(100.0)),
            hit(2, None),
            hit(3, Some(98.0)),
        ];
        let ranges = build_ranges(&hits, 1);
        assert_eq!(ranges.len(), 1);
        // Mean over present values only; the missing one is not zero.
        assert_eq!(ranges[0].avg_pblack, Some(99.0));
        assert_eq!(ranges[0].min_pblack, Some(98.0));
    }

    #[test]
    fn test_no_blackness_values_stays_absent() {
        let ranges = build_ranges(&[hit(1, None), hit(2, None)], 1);
        assert_eq!(ranges[0].avg_pblack, None);
        assert_eq!(ranges[0].min_pblack, None);
    }

    #[test]
    fn test_idempotent_and_invariants() {
        let hits: Vec<Detection> = [3, 4, 9, 10, 11, 20]
            .iter()
            .map(|&f| hit(f, Some(97.5)))
            .collect();
        for min_run in 1..=4 {
            let first = build_ranges(&hits, min_run);
            let second = build_ranges(&hits, min_run);
            assert_eq!(first, second);
            for range in &first {
                assert_eq!(range.length_frames, range.end_frame - range.start_frame + 1);
                assert!(range.length_frames as usize >= min_run);
            }
            for pair in first.windows(2) {
                assert!(pair[0].end_frame < pair[1].start_frame);
            }
        }
    }
}
