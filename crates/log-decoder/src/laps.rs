//! Lap extraction
//!
//! Lap boundaries come from a lap-marker channel when the logger wrote
//! one, from metadata beacon markers or segment times otherwise, and
//! fall back to a single whole-file lap.

use crate::decoder::SessionMetadata;
use serde::{Deserialize, Serialize};

/// A marker-derived final lap longer than this is an in-lap.
pub const IN_LAP_THRESHOLD_S: f64 = 90.0;

/// Half-open sample range `[start, end)` plus lap timing flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lap {
    pub start: usize,
    pub end: usize,
    pub time_s: f64,
    pub is_out_lap: bool,
    pub is_in_lap: bool,
}

/// Derive the ordered lap list for a session.
///
/// Ranges are non-overlapping and cover a contiguous prefix of the
/// sample index; a trailing partial segment after the last marker is
/// discarded.
pub fn extract_laps(
    lap_channel: Option<&[f64]>,
    metadata: &SessionMetadata,
    time: &[f64],
) -> Vec<Lap> {
    if time.is_empty() {
        return Vec::new();
    }

    if let Some(markers) = lap_channel.filter(|m| m.len() == time.len() && !m.is_empty()) {
        return from_lap_channel(markers, time);
    }

    if !metadata.beacon_markers.is_empty() {
        return from_boundaries(&metadata.beacon_markers, &[], time);
    }

    if !metadata.segment_boundaries.is_empty() {
        return from_boundaries(
            &metadata.segment_boundaries,
            &metadata.segment_lap_times,
            time,
        );
    }

    // No marker source at all: one lap covering the whole file.
    vec![Lap {
        start: 0,
        end: time.len(),
        time_s: time[time.len() - 1] - time[0],
        is_out_lap: false,
        is_in_lap: false,
    }]
}

fn from_lap_channel(markers: &[f64], time: &[f64]) -> Vec<Lap> {
    let mut starts = vec![0usize];
    for i in 1..markers.len() {
        if markers[i] != markers[i - 1] {
            starts.push(i);
        }
    }
    starts.push(markers.len());

    let mut laps = Vec::with_capacity(starts.len() - 1);
    for w in starts.windows(2) {
        let (start, end) = (w[0], w[1]);
        let end_time = if end < time.len() {
            time[end]
        } else {
            time[time.len() - 1]
        };
        laps.push(Lap {
            start,
            end,
            time_s: end_time - time[start],
            is_out_lap: false,
            is_in_lap: false,
        });
    }
    mark_out_in(&mut laps);
    laps
}

/// Walk the time channel, cutting a lap at the first index whose time
/// reaches each cumulative boundary.
fn from_boundaries(boundaries: &[f64], lap_times: &[f64], time: &[f64]) -> Vec<Lap> {
    let t0 = time[0];
    let mut laps = Vec::with_capacity(boundaries.len());
    let mut start = 0usize;
    let mut cursor = 0usize;
    let mut previous_boundary = 0.0;

    for (i, boundary) in boundaries.iter().enumerate() {
        while cursor < time.len() && time[cursor] - t0 < *boundary {
            cursor += 1;
        }
        if cursor <= start {
            continue;
        }
        let time_s = lap_times
            .get(i)
            .copied()
            .unwrap_or(boundary - previous_boundary);
        laps.push(Lap {
            start,
            end: cursor,
            time_s,
            is_out_lap: false,
            is_in_lap: false,
        });
        start = cursor;
        previous_boundary = *boundary;
    }

    mark_out_in(&mut laps);
    laps
}

fn mark_out_in(laps: &mut [Lap]) {
    if let Some(first) = laps.first_mut() {
        first.is_out_lap = true;
    }
    if let Some(last) = laps.last_mut() {
        last.is_in_lap = last.time_s > IN_LAP_THRESHOLD_S;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_axis(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_beacon_markers_three_laps() {
        // 10 Hz time column covering 200 s, beacons at 60.0/125.3/188.1.
        let time = time_axis(2000, 0.1);
        let metadata = SessionMetadata {
            beacon_markers: vec![60.0, 125.3, 188.1],
            ..Default::default()
        };

        let laps = extract_laps(None, &metadata, &time);
        assert_eq!(laps.len(), 3);
        assert!((laps[0].time_s - 60.0).abs() < 0.1);
        assert!((laps[1].time_s - 65.3).abs() < 0.1);
        assert!((laps[2].time_s - 62.8).abs() < 0.1);
        assert!(laps[0].is_out_lap);
        assert!(!laps[2].is_in_lap, "62.8 s is under the in-lap threshold");

        // Contiguous prefix, no overlap.
        assert_eq!(laps[0].start, 0);
        assert_eq!(laps[0].end, laps[1].start);
        assert_eq!(laps[1].end, laps[2].start);
    }

    #[test]
    fn test_lap_channel_changes() {
        let time = time_axis(100, 0.1);
        let mut markers = vec![0.0; 100];
        for m in markers.iter_mut().skip(40) {
            *m = 1.0;
        }
        for m in markers.iter_mut().skip(70) {
            *m = 2.0;
        }

        let laps = extract_laps(Some(&markers), &SessionMetadata::default(), &time);
        assert_eq!(laps.len(), 3);
        assert_eq!(laps[0].start, 0);
        assert_eq!(laps[0].end, 40);
        assert_eq!(laps[1].end, 70);
        assert_eq!(laps[2].end, 100);
        assert!((laps[0].time_s - 4.0).abs() < 1e-9);
        assert!(laps[0].is_out_lap);
        assert!(!laps[2].is_in_lap, "2.9 s final lap is not an in-lap");
    }

    #[test]
    fn test_long_final_lap_is_in_lap() {
        let time = time_axis(3000, 0.1);
        let metadata = SessionMetadata {
            beacon_markers: vec![60.0, 155.0, 280.0],
            ..Default::default()
        };
        let laps = extract_laps(None, &metadata, &time);
        assert_eq!(laps.len(), 3);
        assert!((laps[2].time_s - 125.0).abs() < 0.1);
        assert!(laps[2].is_in_lap);
    }

    #[test]
    fn test_segment_times_use_explicit_lap_times() {
        let time = time_axis(2000, 0.1);
        let mut metadata = SessionMetadata::default();
        metadata.segment_boundaries = vec![62.0, 123.5, 185.4];
        metadata.segment_lap_times = vec![62.0, 61.5, 61.9];

        let laps = extract_laps(None, &metadata, &time);
        assert_eq!(laps.len(), 3);
        assert!((laps[1].time_s - 61.5).abs() < 1e-9);
    }

    #[test]
    fn test_fallback_single_lap() {
        let time = time_axis(500, 0.1);
        let laps = extract_laps(None, &SessionMetadata::default(), &time);
        assert_eq!(laps.len(), 1);
        assert_eq!(laps[0].start, 0);
        assert_eq!(laps[0].end, 500);
        assert!(!laps[0].is_out_lap);
        assert!(!laps[0].is_in_lap);
        assert!((laps[0].time_s - 49.9).abs() < 1e-9);
    }

    #[test]
    fn test_empty_time_channel() {
        let laps = extract_laps(None, &SessionMetadata::default(), &[]);
        assert!(laps.is_empty());
    }
}
