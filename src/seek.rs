//! Seek resolution.
//!
//! A seek throws away all derived progression state and re-derives the
//! committed prefix from the target time alone. Strategies are tried in a
//! fixed order and the first one that yields a token wins.

use crate::matcher::ContextMatcher;
use crate::surface::HighlightCommand;
use crate::timing::{containing, last_started};
use serde::{Deserialize, Serialize};
use tracing::debug;
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SeekStrategy {
    /// The word sounding at the target time matched over the full text.
    ContainingEvent,
    /// The closest word that started before the target time matched.
    PrecedingEvent,
    /// Exact word found near the linear position estimate.
    ExactNearGuess,
    /// Pure speaking-rate estimate from the target time.
    SpeakingRate,
    Cleared,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeekResolution {
    pub strategy: SeekStrategy,
    /// Target time after clamping.
    pub time: f64,
    /// Last token of the committed prefix.
    pub matched: Option<usize>,
    /// Timing event the match was derived from, if any.
    pub timing_index: Option<usize>,
}

impl SeekResolution {
    fn cleared(time: f64) -> Self {
        Self {
            strategy: SeekStrategy::Cleared,
            time,
            matched: None,
            timing_index: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeekOutcome {
    pub strategy: SeekStrategy,
    pub time: f64,
    pub highlighted_through: usize,
    pub commands: Vec<HighlightCommand>,
}

impl SeekOutcome {
    pub fn is_cleared(&self) -> bool {
        self.strategy == SeekStrategy::Cleared
    }
}

/// Clamp a requested seek time into `[0, duration]`; an unknown duration
/// (zero or non-finite) leaves the upper end open.
pub fn clamp_seek_time(time: f64, duration: f64) -> f64 {
    if !time.is_finite() {
        return 0.0;
    }
    let time = time.max(0.0);
    if duration.is_finite() && duration > 0.0 {
        time.min(duration)
    } else {
        time
    }
}

pub fn resolve_seek(matcher: &ContextMatcher<'_>, time: f64, duration: f64) -> SeekResolution {
    let time = clamp_seek_time(time, duration);
    let document = matcher.document();
    let timings = matcher.timings();
    let config = matcher.config();

    if document.is_empty() || time <= 0.0 {
        return SeekResolution::cleared(time);
    }
    let last_token = document.len() - 1;

    let full_range = |timing_idx: usize| {
        let guess = matcher.interpolate_text_index(timing_idx);
        matcher
            .find_best_match_in(timing_idx, 0..document.len(), guess)
            .index
    };

    let sounding = containing(timings, time);
    if let Some((timing_idx, matched)) =
        sounding.and_then(|idx| full_range(idx).map(|matched| (idx, matched)))
    {
        return SeekResolution {
            strategy: SeekStrategy::ContainingEvent,
            time,
            matched: Some(matched),
            timing_index: Some(timing_idx),
        };
    }

    let preceding = last_started(timings, time);
    if let Some((timing_idx, matched)) = preceding
        .filter(|&idx| Some(idx) != sounding)
        .and_then(|idx| full_range(idx).map(|matched| (idx, matched)))
    {
        return SeekResolution {
            strategy: SeekStrategy::PrecedingEvent,
            time,
            matched: Some(matched),
            timing_index: Some(timing_idx),
        };
    }

    if let Some(timing_idx) = sounding.or(preceding) {
        let word = timings[timing_idx].normalized.as_str();
        let guess = matcher.interpolate_text_index(timing_idx);
        if let Some(matched) = matcher.nearest_exact(word, guess, config.search_radius) {
            return SeekResolution {
                strategy: SeekStrategy::ExactNearGuess,
                time,
                matched: Some(matched),
                timing_index: Some(timing_idx),
            };
        }
        debug!(timing_index = timing_idx, word, "Seek found no timing-based match");
    }

    let words = (time * config.fallback_words_per_sec).floor() as usize;
    if let Some(matched) = words.checked_sub(1) {
        return SeekResolution {
            strategy: SeekStrategy::SpeakingRate,
            time,
            matched: Some(matched.min(last_token)),
            timing_index: None,
        };
    }

    SeekResolution::cleared(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AlignerConfig;
    use crate::timing::{RawTimingRecord, TimingEvent, ingest};
    use crate::tokenizer::Document;

    fn timings_for(words: &[&str]) -> Vec<TimingEvent> {
        let records: Vec<RawTimingRecord> = words
            .iter()
            .enumerate()
            .map(|(i, word)| RawTimingRecord {
                word: word.to_string(),
                time_start: i as f64 * 0.4,
                time_end: i as f64 * 0.4 + 0.3,
            })
            .collect();
        ingest(&records, 0)
    }

    const WORDS: [&str; 6] = ["the", "quick", "brown", "fox", "jumps", "high"];

    #[test]
    fn clamps_out_of_range_times() {
        assert_eq!(clamp_seek_time(-3.0, 10.0), 0.0);
        assert_eq!(clamp_seek_time(12.0, 10.0), 10.0);
        assert_eq!(clamp_seek_time(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_seek_time(12.0, 0.0), 12.0);
    }

    #[test]
    fn cleared_outcome_is_reported() {
        let outcome = SeekOutcome {
            strategy: SeekStrategy::Cleared,
            time: 0.0,
            highlighted_through: 0,
            commands: vec![HighlightCommand::ClearAll],
        };
        assert!(outcome.is_cleared());
        let resumed = SeekOutcome {
            strategy: SeekStrategy::PrecedingEvent,
            ..outcome
        };
        assert!(!resumed.is_cleared());
    }

    #[test]
    fn sounding_word_wins() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = timings_for(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);

        let resolution = resolve_seek(&matcher, 0.9, 3.0);
        assert_eq!(resolution.strategy, SeekStrategy::ContainingEvent);
        assert_eq!(resolution.matched, Some(2));
        assert_eq!(resolution.timing_index, Some(2));
    }

    #[test]
    fn gap_between_words_uses_preceding_event() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = timings_for(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);

        let resolution = resolve_seek(&matcher, 0.75, 3.0);
        assert_eq!(resolution.strategy, SeekStrategy::PrecedingEvent);
        assert_eq!(resolution.matched, Some(1));
    }

    #[test]
    fn start_of_audio_clears() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = timings_for(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);

        let resolution = resolve_seek(&matcher, -1.0, 3.0);
        assert_eq!(resolution.strategy, SeekStrategy::Cleared);
        assert_eq!(resolution.time, 0.0);
        assert_eq!(resolution.matched, None);
    }

    #[test]
    fn without_timings_falls_back_to_speaking_rate() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let matcher = ContextMatcher::new(&doc, &[], &config);

        let resolution = resolve_seek(&matcher, 1.0, 0.0);
        assert_eq!(resolution.strategy, SeekStrategy::SpeakingRate);
        assert_eq!(resolution.matched, Some(1));

        let resolution = resolve_seek(&matcher, 0.2, 0.0);
        assert_eq!(resolution.strategy, SeekStrategy::Cleared);
    }

    #[test]
    fn unmatched_word_uses_exact_search_near_guess() {
        // Neither context nor word agree for a full match, but the word
        // appears verbatim close to the linear estimate.
        let config = AlignerConfig {
            exact_threshold: 0.9,
            ..AlignerConfig::default()
        };
        let doc = Document::from_words(&["alpha", "beta", "gamma", "delta"]);
        let timings = timings_for(&["x1", "x2", "gamma", "x4"]);
        let matcher = ContextMatcher::new(&doc, &timings, &config);

        let resolution = resolve_seek(&matcher, 0.9, 2.0);
        assert_eq!(resolution.strategy, SeekStrategy::ExactNearGuess);
        assert_eq!(resolution.matched, Some(2));
    }
}
