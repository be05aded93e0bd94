//! Forward highlight progression.
//!
//! The controller is driven by audio-time ticks. Each tick it derives a
//! ceiling from the timing stream, processes timing events that became due
//! since the last tick and commits highlights no further than the ceiling.
//! Seeks and clears reset everything; nothing else ever moves the watermark
//! backwards.

mod state;

pub use state::{Ceiling, HighlightState, Phase};

use crate::config::AlignerConfig;
use crate::matcher::ContextMatcher;
use crate::seek::{SeekOutcome, resolve_seek};
use crate::surface::HighlightCommand;
use crate::timing::last_started;
use std::ops::Range;
use tracing::{debug, info, trace};

const GAP_EPSILON: f64 = 1e-9;

/// Text indices to highlight for the audio gap between two matched words.
///
/// Gaps no longer than `min_gap_secs` cannot hold an extra word, so the whole
/// span between the matches is filled. Longer gaps are estimated at
/// `gap_words_per_sec`, clamped to the slots actually available.
pub fn gap_fill_range(
    current: usize,
    next: usize,
    gap_secs: f64,
    config: &AlignerConfig,
) -> Range<usize> {
    let first = current + 1;
    if next <= first {
        return first..first;
    }
    if gap_secs <= config.min_gap_secs + GAP_EPSILON {
        return first..next;
    }
    let available = next - first;
    let estimated = (gap_secs * config.gap_words_per_sec).ceil().max(0.0) as usize;
    first..first + estimated.min(available)
}

#[derive(Debug, Clone, Default)]
pub struct HighlightController {
    state: HighlightState,
}

impl HighlightController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn highlighted_through(&self) -> usize {
        self.state.highlighted_through
    }

    pub fn ceiling(&self) -> Ceiling {
        self.state.ceiling
    }

    /// Drop all committed and derived state.
    pub fn reset(&mut self) -> Vec<HighlightCommand> {
        let cleared = self.state.highlighted_through;
        self.state = HighlightState::default();
        debug!(cleared, "Highlight state reset");
        vec![HighlightCommand::ClearAll]
    }

    pub fn replay(&self) -> Vec<HighlightCommand> {
        self.state.replay()
    }

    pub fn tick(
        &mut self,
        matcher: &ContextMatcher<'_>,
        time: f64,
        duration: f64,
    ) -> Vec<HighlightCommand> {
        let token_count = matcher.document().len();
        let mut out = Vec::new();
        if token_count == 0 || self.state.phase == Phase::EndFlush {
            return out;
        }
        let time = if time.is_finite() { time.max(0.0) } else { 0.0 };
        let config = matcher.config();
        self.state.provisional.clear();

        if duration > 0.0 && time >= duration - config.end_flush_secs {
            return self.end_flush(token_count);
        }

        let timings = matcher.timings();
        let Some(first) = timings.first() else {
            self.advance_by_rate(time, token_count, config, &mut out);
            return out;
        };
        if time < first.start_secs {
            self.initial_lookahead(matcher, time, first.start_secs, &mut out);
            return out;
        }

        self.set_phase(Phase::Streaming);
        self.state.ceiling = self.compute_ceiling(matcher, time);
        self.process_due_events(matcher, time, &mut out);
        self.catch_up(matcher, time, &mut out);
        self.release_gap(token_count, &mut out);
        out
    }

    /// Highlight everything left, ignoring the ceiling.
    pub fn end_flush(&mut self, token_count: usize) -> Vec<HighlightCommand> {
        let mut out = Vec::new();
        let remaining = token_count.saturating_sub(self.state.highlighted_through);
        if let Some(last) = token_count.checked_sub(1) {
            self.state.commit_through(last, token_count, &mut out);
        }
        self.state.ceiling = Ceiling::Unbounded;
        self.state.gap_target = None;
        if self.state.phase != Phase::EndFlush {
            info!(remaining, "End of audio; flushing remaining highlights");
        }
        self.state.phase = Phase::EndFlush;
        out
    }

    /// Reset, then commit the prefix derived from `time` alone.
    pub fn seek(&mut self, matcher: &ContextMatcher<'_>, time: f64, duration: f64) -> SeekOutcome {
        let resolution = resolve_seek(matcher, time, duration);
        let token_count = matcher.document().len();
        let timings = matcher.timings();

        let mut commands = self.reset();
        self.state.ceiling = Ceiling::Unbounded;
        if let Some(matched) = resolution.matched {
            self.state.commit_through(matched, token_count, &mut commands);
            self.state.last_matched = Some(matched);
            if let Some(timing_idx) = resolution.timing_index {
                self.state.resolved.insert(timing_idx, Some(matched));
            }
        }
        // Events already under way at the target are accounted for by the
        // resolution; do not replay them on the next tick.
        self.state.next_timing =
            timings.partition_point(|event| event.start_secs <= resolution.time);
        self.state.phase = if self.state.highlighted_through > 0 {
            Phase::Streaming
        } else {
            Phase::Idle
        };

        info!(
            time = resolution.time,
            strategy = ?resolution.strategy,
            matched = ?resolution.matched,
            "Seek resolved"
        );
        SeekOutcome {
            strategy: resolution.strategy,
            time: resolution.time,
            highlighted_through: self.state.highlighted_through,
            commands,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            debug!(from = ?self.state.phase, to = ?phase, "Highlight phase changed");
            self.state.phase = phase;
        }
    }

    fn advance_by_rate(
        &mut self,
        time: f64,
        token_count: usize,
        config: &AlignerConfig,
        out: &mut Vec<HighlightCommand>,
    ) {
        let words = (time * config.fallback_words_per_sec).floor() as usize;
        match words.checked_sub(1) {
            Some(target) => {
                let target = target.min(token_count - 1);
                self.set_phase(Phase::Streaming);
                self.state.ceiling = Ceiling::Index(target);
                self.state.commit_clamped(target, token_count, out);
            }
            None => self.state.ceiling = Ceiling::Blocked,
        }
    }

    fn initial_lookahead(
        &mut self,
        matcher: &ContextMatcher<'_>,
        time: f64,
        first_start: f64,
        out: &mut Vec<HighlightCommand>,
    ) {
        let config = matcher.config();
        if time < first_start - config.lookahead_secs {
            self.set_phase(Phase::Idle);
            self.state.ceiling = Ceiling::Blocked;
            return;
        }
        self.set_phase(Phase::InitialLookahead);

        let token_count = matcher.document().len();
        let estimated = ((time * config.fallback_words_per_sec).ceil() as usize)
            .min(config.initial_max_words);
        // Leading text (titles, headings) may precede the first spoken word.
        let before_first = self.anchor(matcher, 0).unwrap_or(usize::MAX);
        let words = estimated.min(before_first);
        match words.checked_sub(1) {
            Some(target) => {
                self.state.ceiling = Ceiling::Index(target);
                self.state.commit_clamped(target, token_count, out);
            }
            None => self.state.ceiling = Ceiling::Blocked,
        }
    }

    /// Text index for timing event `timing_idx`.
    ///
    /// Events already processed answer with the match decided when they
    /// became due. Anything else is looked up against the current state and
    /// reused only until the next tick.
    fn anchor(&mut self, matcher: &ContextMatcher<'_>, timing_idx: usize) -> Option<usize> {
        if let Some(&decided) = self.state.resolved.get(&timing_idx) {
            return decided;
        }
        if let Some(&pending) = self.state.provisional.get(&timing_idx) {
            return pending;
        }
        let found = self.match_event(matcher, timing_idx);
        self.state.provisional.insert(timing_idx, found);
        found
    }

    fn known_anchor(&self, timing_idx: usize) -> Option<usize> {
        match self.state.resolved.get(&timing_idx) {
            Some(&decided) => decided,
            None => self.state.provisional.get(&timing_idx).copied().flatten(),
        }
    }

    /// Fresh context match for one timing event, with a bounded forward exact
    /// search from the watermark when the match is rejected.
    fn match_event(&self, matcher: &ContextMatcher<'_>, timing_idx: usize) -> Option<usize> {
        let center = timing_idx
            .checked_sub(1)
            .and_then(|prev| self.known_anchor(prev))
            .or(self.state.last_matched)
            .map(|matched| matched + 1)
            .unwrap_or_else(|| matcher.interpolate_text_index(timing_idx));

        let result = matcher.find_best_match(timing_idx, center);
        result.index.or_else(|| {
            let word = matcher.timings()[timing_idx].normalized.as_str();
            let found = matcher.forward_exact_search(
                word,
                self.state.highlighted_through,
                matcher.config().forward_search_limit,
            );
            if found.is_none() {
                debug!(
                    timing_index = timing_idx,
                    word,
                    probability = result.probability,
                    "No confident match for timing event"
                );
            }
            found
        })
    }

    fn anchor_or_estimate(&mut self, matcher: &ContextMatcher<'_>, timing_idx: usize) -> usize {
        self.anchor(matcher, timing_idx)
            .unwrap_or_else(|| matcher.interpolate_text_index(timing_idx))
    }

    fn compute_ceiling(&mut self, matcher: &ContextMatcher<'_>, time: f64) -> Ceiling {
        let timings = matcher.timings();
        let token_count = matcher.document().len();
        let Some(last) = last_started(timings, time) else {
            return Ceiling::Blocked;
        };
        let current = self.anchor_or_estimate(matcher, last);
        let event = &timings[last];
        if time <= event.end_secs {
            return Ceiling::Index(current);
        }

        let elapsed = time - event.end_secs;
        let Some(next) = timings.get(last + 1) else {
            // Past the final timed word: trailing text advances at the fallback rate.
            let extra = (elapsed * matcher.config().fallback_words_per_sec).floor() as usize;
            return Ceiling::Index((current + extra).min(token_count - 1));
        };
        let upcoming = self.anchor_or_estimate(matcher, last + 1);
        if upcoming <= current + 1 {
            return Ceiling::Index(current);
        }
        let slots = upcoming - current - 1;
        let gap = next.start_secs - event.end_secs;
        let fraction = if gap > 0.0 {
            (elapsed / gap).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let extra = ((fraction * slots as f64).floor() as usize).min(slots);
        Ceiling::Index(current + extra)
    }

    fn process_due_events(
        &mut self,
        matcher: &ContextMatcher<'_>,
        time: f64,
        out: &mut Vec<HighlightCommand>,
    ) {
        let timings = matcher.timings();
        let token_count = matcher.document().len();
        let lookahead = matcher.config().lookahead_secs;

        while let Some(event) = timings.get(self.state.next_timing) {
            if event.start_secs - lookahead > time {
                break;
            }
            let timing_idx = self.state.next_timing;
            self.state.next_timing += 1;

            let found = self.match_event(matcher, timing_idx);
            self.state.provisional.remove(&timing_idx);
            self.state.resolved.insert(timing_idx, found);
            let Some(matched) = found else {
                continue;
            };
            if self.state.last_matched.is_none_or(|last| matched >= last) {
                self.state.last_matched = Some(matched);
            }
            trace!(timing_index = timing_idx, matched, "Timing event due");
            self.state.commit_clamped(matched, token_count, out);
            self.plan_gap(matcher, timing_idx, matched);
        }
    }

    fn plan_gap(&mut self, matcher: &ContextMatcher<'_>, timing_idx: usize, matched: usize) {
        let timings = matcher.timings();
        let Some(next) = timings.get(timing_idx + 1) else {
            return;
        };
        let Some(upcoming) = self.anchor(matcher, timing_idx + 1) else {
            return;
        };
        let gap_secs = next.start_secs - timings[timing_idx].end_secs;
        let range = gap_fill_range(matched, upcoming, gap_secs, matcher.config());
        if range.is_empty() {
            return;
        }
        let last = range.end - 1;
        trace!(from = range.start, through = last, gap_secs, "Planned gap fill");
        let pending = self.state.gap_target.map_or(last, |pending| pending.max(last));
        self.state.gap_target = Some(pending);
    }

    /// Keep the watermark from lagging behind the latest word already spoken.
    fn catch_up(
        &mut self,
        matcher: &ContextMatcher<'_>,
        time: f64,
        out: &mut Vec<HighlightCommand>,
    ) {
        let timings = matcher.timings();
        let token_count = matcher.document().len();
        let Some(last) = last_started(timings, time) else {
            return;
        };
        if let Some(matched) = self.anchor(matcher, last) {
            self.state.commit_clamped(matched, token_count, out);
        }
        if last + 1 == timings.len() && time > timings[last].end_secs {
            if let Ceiling::Index(limit) = self.state.ceiling {
                self.state.commit_clamped(limit, token_count, out);
            }
        }
    }

    fn release_gap(&mut self, token_count: usize, out: &mut Vec<HighlightCommand>) {
        let Some(target) = self.state.gap_target else {
            return;
        };
        self.state.commit_clamped(target, token_count, out);
        if self.state.highlighted_through > target {
            self.state.gap_target = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seek::SeekStrategy;
    use crate::timing::{RawTimingRecord, TimingEvent, ingest};
    use crate::tokenizer::Document;

    fn record(word: &str, start: f64, end: f64) -> RawTimingRecord {
        RawTimingRecord {
            word: word.to_string(),
            time_start: start,
            time_end: end,
        }
    }

    fn evenly_timed(words: &[&str]) -> Vec<TimingEvent> {
        let records: Vec<RawTimingRecord> = words
            .iter()
            .enumerate()
            .map(|(i, word)| record(word, i as f64 * 0.4, i as f64 * 0.4 + 0.3))
            .collect();
        ingest(&records, 0)
    }

    fn highlighted(commands: &[HighlightCommand]) -> Vec<usize> {
        commands
            .iter()
            .filter_map(|command| match command {
                HighlightCommand::Highlight { index } => Some(*index),
                _ => None,
            })
            .collect()
    }

    const WORDS: [&str; 5] = ["the", "quick", "brown", "fox", "jumps"];

    #[test]
    fn gap_fill_estimate_is_clamped_to_available_slots() {
        let config = AlignerConfig::default();
        assert_eq!(gap_fill_range(5, 9, 0.5, &config), 6..8);
        assert_eq!(gap_fill_range(5, 9, 5.0, &config), 6..9);
        assert_eq!(gap_fill_range(5, 9, 0.1, &config), 6..9);
        assert_eq!(gap_fill_range(5, 6, 0.5, &config), 6..6);
        assert_eq!(gap_fill_range(5, 3, 0.5, &config), 6..6);
    }

    #[test]
    fn streaming_follows_spoken_words() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = evenly_timed(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        assert_eq!(highlighted(&controller.tick(&matcher, 0.0, 10.0)), vec![0]);
        assert_eq!(controller.phase(), Phase::Streaming);
        assert_eq!(controller.ceiling(), Ceiling::Index(0));

        // "quick" is within the lookahead window but not yet spoken.
        assert!(controller.tick(&matcher, 0.35, 10.0).is_empty());
        assert_eq!(controller.highlighted_through(), 1);

        let commands = controller.tick(&matcher, 0.45, 10.0);
        assert_eq!(
            commands,
            vec![
                HighlightCommand::MarkRead { index: 0 },
                HighlightCommand::Highlight { index: 1 },
            ]
        );
        assert_eq!(highlighted(&controller.tick(&matcher, 1.65, 10.0)), vec![2, 3, 4]);
    }

    #[test]
    fn repeated_tick_emits_nothing_new() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = evenly_timed(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        assert!(!controller.tick(&matcher, 0.85, 10.0).is_empty());
        assert!(controller.tick(&matcher, 0.85, 10.0).is_empty());
    }

    #[test]
    fn gap_words_advance_with_elapsed_time() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&["one", "two", "three", "four", "five", "six"]);
        let timings = ingest(&[record("one", 0.0, 0.3), record("six", 1.3, 1.6)], 0);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        assert_eq!(highlighted(&controller.tick(&matcher, 0.0, 10.0)), vec![0]);
        // Halfway through a one-second gap holding four untimed words.
        assert_eq!(highlighted(&controller.tick(&matcher, 0.8, 10.0)), vec![1, 2]);
        assert_eq!(controller.ceiling(), Ceiling::Index(2));
        assert_eq!(highlighted(&controller.tick(&matcher, 1.35, 10.0)), vec![3, 4, 5]);
    }

    #[test]
    fn gap_words_stay_behind_the_interpolated_ceiling() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&[
            "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
            "eleven",
        ]);
        let timings = ingest(
            &[
                record("zero", 0.0, 0.2),
                record("one", 0.36, 0.56),
                record("two", 0.72, 0.92),
                record("three", 1.08, 1.28),
                record("four", 1.44, 1.64),
                record("five", 1.8, 2.0),
                record("nine", 2.5, 2.8),
                record("ten", 2.9, 3.1),
                record("eleven", 3.2, 3.4),
            ],
            0,
        );
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        for time in [0.0, 0.5, 1.0, 1.5, 1.9] {
            controller.tick(&matcher, time, 10.0);
        }
        assert_eq!(controller.highlighted_through(), 6);

        // Half a second of silence before "nine" holds two estimated words.
        assert_eq!(highlighted(&controller.tick(&matcher, 2.2, 10.0)), vec![6]);
        assert_eq!(highlighted(&controller.tick(&matcher, 2.45, 10.0)), vec![7]);
        assert_eq!(controller.highlighted_through(), 8);
        assert_eq!(controller.ceiling(), Ceiling::Index(7));

        // "eight" only goes up together with "nine".
        assert_eq!(highlighted(&controller.tick(&matcher, 2.5, 10.0)), vec![8, 9]);
    }

    #[test]
    fn rejected_match_falls_back_to_forward_exact_search() {
        let config = AlignerConfig {
            search_radius: 1,
            fuzzy_threshold: 2.0,
            ..AlignerConfig::default()
        };
        let doc = Document::from_words(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let timings = ingest(&[record("a", 0.0, 0.2), record("e", 0.4, 0.6)], 0);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        assert_eq!(highlighted(&controller.tick(&matcher, 0.0, 10.0)), vec![0]);
        // "e" sits outside the window around the search center but within
        // reach of the watermark.
        assert_eq!(highlighted(&controller.tick(&matcher, 0.5, 10.0)), vec![1, 2, 3, 4]);
        assert_eq!(controller.ceiling(), Ceiling::Index(4));
    }

    #[test]
    fn upcoming_events_are_requeried_every_tick() {
        let config = AlignerConfig {
            search_radius: 1,
            fuzzy_threshold: 2.0,
            forward_search_limit: 3,
            ..AlignerConfig::default()
        };
        let doc = Document::from_words(&["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"]);
        let timings = ingest(
            &[
                record("a", 0.0, 0.2),
                record("c", 1.0, 1.2),
                record("f", 2.0, 2.2),
            ],
            0,
        );
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        controller.tick(&matcher, 0.0, 10.0);
        // "f" is out of reach while the watermark is at 1.
        assert_eq!(highlighted(&controller.tick(&matcher, 1.5, 10.0)), vec![1, 2]);
        assert_eq!(controller.highlighted_through(), 3);

        // From the new watermark it is found, so the gap ceiling narrows to
        // the real slots instead of the interpolated position.
        assert!(controller.tick(&matcher, 1.6, 10.0).is_empty());
        assert_eq!(controller.ceiling(), Ceiling::Index(3));

        assert_eq!(highlighted(&controller.tick(&matcher, 2.1, 10.0)), vec![3, 4, 5]);
        assert_eq!(controller.highlighted_through(), 6);
    }

    #[test]
    fn initial_lookahead_skips_to_leading_text() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&["chapter", "one", "the", "quick"]);
        let timings = ingest(&[record("the", 1.0, 1.3), record("quick", 1.4, 1.7)], 0);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        assert!(controller.tick(&matcher, 0.5, 10.0).is_empty());
        assert_eq!(controller.phase(), Phase::Idle);

        assert_eq!(highlighted(&controller.tick(&matcher, 0.95, 10.0)), vec![0, 1]);
        assert_eq!(controller.phase(), Phase::InitialLookahead);
        assert!(!controller.ceiling().allows(2));
    }

    #[test]
    fn end_flush_ignores_ceiling() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&["a", "b", "c", "d", "e", "f"]);
        let timings = ingest(&[record("a", 0.0, 0.2)], 0);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        controller.tick(&matcher, 0.1, 3.0);
        let commands = controller.tick(&matcher, 2.95, 3.0);
        assert_eq!(highlighted(&commands), vec![1, 2, 3, 4, 5]);
        assert_eq!(controller.phase(), Phase::EndFlush);
        assert!(controller.tick(&matcher, 3.0, 3.0).is_empty());
    }

    #[test]
    fn missing_timings_use_speaking_rate() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&["w"; 10]);
        let matcher = ContextMatcher::new(&doc, &[], &config);
        let mut controller = HighlightController::new();

        assert!(controller.tick(&matcher, 0.2, 0.0).is_empty());
        assert_eq!(highlighted(&controller.tick(&matcher, 1.0, 0.0)), vec![0, 1]);
        assert_eq!(controller.highlighted_through(), 2);
    }

    #[test]
    fn seek_resets_then_resumes_from_target() {
        let config = AlignerConfig::default();
        let doc = Document::from_words(&WORDS);
        let timings = evenly_timed(&WORDS);
        let matcher = ContextMatcher::new(&doc, &timings, &config);
        let mut controller = HighlightController::new();

        controller.tick(&matcher, 1.3, 10.0);
        assert_eq!(controller.highlighted_through(), 4);

        let outcome = controller.seek(&matcher, 0.5, 10.0);
        assert_eq!(outcome.strategy, SeekStrategy::ContainingEvent);
        assert_eq!(outcome.commands.first(), Some(&HighlightCommand::ClearAll));
        assert_eq!(highlighted(&outcome.commands), vec![0, 1]);
        assert_eq!(controller.state().next_timing(), 2);

        // The processed pointer restarted at the seek target.
        assert!(controller.tick(&matcher, 0.5, 10.0).is_empty());
        assert_eq!(highlighted(&controller.tick(&matcher, 0.85, 10.0)), vec![2]);
    }
}
