//! Timing stream ingest.
//!
//! Raw records come from an external speech/transcript pipeline as
//! `{ word, time_start, time_end }` in seconds. Ingest applies the configured
//! millisecond offset, floors times at zero and stable-sorts by start time.

use crate::normalizer::normalize_word;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTimingRecord {
    pub word: String,
    pub time_start: f64,
    pub time_end: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimingEvent {
    pub word: String,
    pub normalized: String,
    pub start_secs: f64,
    pub end_secs: f64,
}

impl TimingEvent {
    pub fn contains(&self, time: f64) -> bool {
        self.start_secs <= time && time <= self.end_secs
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimingFile {
    Bare(Vec<RawTimingRecord>),
    Wrapped { words: Vec<RawTimingRecord> },
}

/// Normalize raw records into a start-ordered event sequence.
pub fn ingest(records: &[RawTimingRecord], offset_ms: i64) -> Vec<TimingEvent> {
    let shift = offset_ms as f64 / 1000.0;
    let mut dropped = 0usize;

    let mut events: Vec<TimingEvent> = records
        .iter()
        .filter_map(|record| {
            if !record.time_start.is_finite() || !record.time_end.is_finite() {
                dropped += 1;
                return None;
            }
            let start_secs = (record.time_start + shift).max(0.0);
            let end_secs = (record.time_end + shift).max(start_secs);
            Some(TimingEvent {
                word: record.word.clone(),
                normalized: normalize_word(&record.word),
                start_secs,
                end_secs,
            })
        })
        .collect();

    if dropped > 0 {
        warn!(dropped, "Dropped timing records with non-finite times");
    }

    // `sort_by` is stable, so equal start times keep their input order.
    events.sort_by(|a, b| a.start_secs.total_cmp(&b.start_secs));
    debug!(events = events.len(), offset_ms, "Ingested timing stream");
    events
}

/// Parse a JSON timing file: either a bare array or `{ "words": [...] }`.
pub fn parse_timing_json(data: &str) -> Result<Vec<RawTimingRecord>> {
    let file: TimingFile = serde_json::from_str(data).context("Parsing timing JSON")?;
    Ok(match file {
        TimingFile::Bare(records) => records,
        TimingFile::Wrapped { words } => words,
    })
}

pub fn load_timings(path: &Path, offset_ms: i64) -> Result<Vec<TimingEvent>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read timings from {}", path.display()))?;
    let records = parse_timing_json(&data)
        .with_context(|| format!("Invalid timing file {}", path.display()))?;
    info!(
        path = %path.display(),
        records = records.len(),
        offset_ms,
        "Loaded timing records"
    );
    Ok(ingest(&records, offset_ms))
}

/// Index of the last event whose start time has elapsed at `time`.
pub fn last_started(events: &[TimingEvent], time: f64) -> Option<usize> {
    events
        .partition_point(|event| event.start_secs <= time)
        .checked_sub(1)
}

/// Index of an event whose `[start, end]` window contains `time`.
pub fn containing(events: &[TimingEvent], time: f64) -> Option<usize> {
    let last = last_started(events, time)?;
    if events[last].contains(time) {
        return Some(last);
    }
    // Overlapping windows: the previous word may still be sounding.
    let prev = last.checked_sub(1)?;
    events[prev].contains(time).then_some(prev)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(word: &str, start: f64, end: f64) -> RawTimingRecord {
        RawTimingRecord {
            word: word.to_string(),
            time_start: start,
            time_end: end,
        }
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn negative_offset_shifts_times() {
        let events = ingest(&[record("a", 1.0, 1.2)], -100);
        assert!(approx(events[0].start_secs, 0.9));
        assert!(approx(events[0].end_secs, 1.1));
    }

    #[test]
    fn large_negative_offset_clamps_to_zero() {
        let events = ingest(&[record("a", 1.0, 1.2)], -2000);
        assert_eq!(events[0].start_secs, 0.0);
        assert_eq!(events[0].end_secs, 0.0);
    }

    #[test]
    fn unsorted_input_is_stable_sorted() {
        let events = ingest(
            &[
                record("c", 2.0, 2.5),
                record("a", 0.5, 0.8),
                record("b1", 1.0, 1.2),
                record("b2", 1.0, 1.3),
            ],
            0,
        );
        let words: Vec<&str> = events.iter().map(|e| e.word.as_str()).collect();
        assert_eq!(words, vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn non_finite_records_are_dropped() {
        let events = ingest(&[record("a", f64::NAN, 1.0), record("b", 1.0, 1.5)], 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].normalized, "b");
    }

    #[test]
    fn parses_bare_and_wrapped_json() {
        let bare = r#"[{"word":"Hi,","time_start":0.1,"time_end":0.4}]"#;
        let wrapped = r#"{"words":[{"word":"Hi,","time_start":0.1,"time_end":0.4}]}"#;
        assert_eq!(
            parse_timing_json(bare).expect("bare"),
            parse_timing_json(wrapped).expect("wrapped")
        );
        assert!(parse_timing_json("{\"nope\":1}").is_err());
    }

    #[test]
    fn lookups_by_time() {
        let events = ingest(
            &[record("a", 0.0, 0.3), record("b", 0.5, 0.9), record("c", 1.0, 1.4)],
            0,
        );
        assert_eq!(last_started(&events, -1.0), None);
        assert_eq!(last_started(&events, 0.6), Some(1));
        assert_eq!(containing(&events, 0.6), Some(1));
        assert_eq!(containing(&events, 0.95), None);
        assert_eq!(last_started(&events, 5.0), Some(2));
    }
}
