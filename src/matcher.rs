//! Context-similarity matching between the timing stream and the reference text.
//!
//! Every other component is built on [`ContextMatcher`]: a candidate token is
//! scored by exact lexical agreement with the spoken word plus agreement of the
//! words around it on both sides. The blend ratios and acceptance thresholds
//! come from [`AlignerConfig`] and default to the empirically chosen values
//! (0.4/0.6 word/context, 0.6/0.4 set/positional, thresholds 0.2/0.3).

use crate::config::AlignerConfig;
use crate::timing::TimingEvent;
use crate::tokenizer::Document;
use std::ops::Range;

const SCORE_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchResult {
    /// Accepted text index; `None` when the best candidate fell below threshold.
    pub index: Option<usize>,
    pub probability: f64,
    pub word_score: f64,
    pub context_score: f64,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            index: None,
            probability: 0.0,
            word_score: 0.0,
            context_score: 0.0,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.index.is_some()
    }
}

/// Reverse match: the timing event best corresponding to a text index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingMatch {
    pub timing_index: usize,
    pub start_secs: f64,
    pub probability: f64,
    pub context_score: f64,
}

/// Blend of set overlap and positional agreement between two word windows.
pub fn context_similarity(
    audio: &[&str],
    text: &[&str],
    set_overlap_weight: f64,
    positional_weight: f64,
) -> f64 {
    match (audio.is_empty(), text.is_empty()) {
        (true, true) => return 1.0,
        (true, false) | (false, true) => return 0.0,
        (false, false) => {}
    }

    let present = audio.iter().filter(|word| text.contains(word)).count();
    let set_overlap = present as f64 / audio.len().max(text.len()) as f64;

    let aligned = audio.len().min(text.len());
    let positional = audio
        .iter()
        .zip(text.iter())
        .filter(|(a, b)| a == b)
        .count() as f64
        / aligned as f64;

    set_overlap_weight * set_overlap + positional_weight * positional
}

/// Score one candidate token against the spoken word, given both neighborhoods.
///
/// The returned result carries no index; callers attach one when accepted.
pub fn score_candidate(
    target_word: &str,
    audio_context: &[&str],
    candidate_word: &str,
    text_context: &[&str],
    config: &AlignerConfig,
) -> MatchResult {
    let word_score = if !target_word.is_empty() && target_word == candidate_word {
        1.0
    } else {
        0.0
    };
    let context_score = context_similarity(
        audio_context,
        text_context,
        config.set_overlap_weight,
        config.positional_weight,
    );
    MatchResult {
        index: None,
        probability: config.word_weight * word_score + config.context_weight * context_score,
        word_score,
        context_score,
    }
}

/// Exact lexical matches are trusted with less contextual corroboration.
pub fn acceptance_threshold(word_score: f64, config: &AlignerConfig) -> f64 {
    if word_score >= 1.0 {
        config.exact_threshold
    } else {
        config.fuzzy_threshold
    }
}

/// Borrowed view over one section's text and timings.
#[derive(Clone, Copy)]
pub struct ContextMatcher<'a> {
    document: &'a Document,
    timings: &'a [TimingEvent],
    config: &'a AlignerConfig,
}

impl<'a> ContextMatcher<'a> {
    pub fn new(
        document: &'a Document,
        timings: &'a [TimingEvent],
        config: &'a AlignerConfig,
    ) -> Self {
        Self {
            document,
            timings,
            config,
        }
    }

    pub fn document(&self) -> &'a Document {
        self.document
    }

    pub fn timings(&self) -> &'a [TimingEvent] {
        self.timings
    }

    pub fn config(&self) -> &'a AlignerConfig {
        self.config
    }

    /// Populated timing words around `timing_idx`, center excluded.
    pub fn audio_context(&self, timing_idx: usize) -> Vec<&'a str> {
        let radius = self.config.context_radius;
        let start = timing_idx.saturating_sub(radius);
        let end = (timing_idx + radius + 1).min(self.timings.len());
        (start..end)
            .filter(|&idx| idx != timing_idx)
            .map(|idx| self.timings[idx].normalized.as_str())
            .filter(|word| !word.is_empty())
            .collect()
    }

    /// Populated text words around `text_idx`, center excluded.
    pub fn text_context(&self, text_idx: usize) -> Vec<&'a str> {
        let radius = self.config.context_radius;
        let start = text_idx.saturating_sub(radius);
        let end = (text_idx + radius + 1).min(self.document.len());
        self.window_words(start..end, Some(text_idx))
    }

    /// Populated text words in `range`, optionally skipping one index.
    pub fn window_words(&self, range: Range<usize>, skip: Option<usize>) -> Vec<&'a str> {
        let tokens = self.document.tokens();
        let end = range.end.min(tokens.len());
        let start = range.start.min(end);
        tokens[start..end]
            .iter()
            .filter(|token| Some(token.index) != skip && token.is_populated())
            .map(|token| token.normalized.as_str())
            .collect()
    }

    /// Score the token at `text_idx` as the one spoken at timing event `timing_idx`.
    pub fn score(&self, timing_idx: usize, text_idx: usize) -> MatchResult {
        let Some(event) = self.timings.get(timing_idx) else {
            return MatchResult::none();
        };
        let Some(token) = self.document.token(text_idx) else {
            return MatchResult::none();
        };
        let audio_context = self.audio_context(timing_idx);
        let text_context = self.text_context(text_idx);
        let mut result = score_candidate(
            &event.normalized,
            &audio_context,
            &token.normalized,
            &text_context,
            self.config,
        );
        let threshold = acceptance_threshold(result.word_score, self.config);
        if result.probability + SCORE_EPSILON >= threshold {
            result.index = Some(text_idx);
        }
        result
    }

    /// Best candidate within `search_radius` of `center`; ties go to the earliest index.
    pub fn find_best_match(&self, timing_idx: usize, center: usize) -> MatchResult {
        if self.document.is_empty() {
            return MatchResult::none();
        }
        let radius = self.config.search_radius;
        let center = center.min(self.document.len() - 1);
        let start = center.saturating_sub(radius);
        let end = (center + radius + 1).min(self.document.len());
        // Ascending scan: never replacing on a tie keeps the earliest index.
        self.best_in(timing_idx, start..end, |_, _| false)
    }

    /// Best candidate anywhere in `range`; ties go to the index closest to `guess`.
    pub fn find_best_match_in(
        &self,
        timing_idx: usize,
        range: Range<usize>,
        guess: usize,
    ) -> MatchResult {
        let range = range.start.min(self.document.len())..range.end.min(self.document.len());
        self.best_in(timing_idx, range, |best, candidate| {
            candidate.abs_diff(guess) < best.abs_diff(guess)
        })
    }

    fn best_in(
        &self,
        timing_idx: usize,
        range: Range<usize>,
        prefer_on_tie: impl Fn(usize, usize) -> bool,
    ) -> MatchResult {
        let mut best: Option<(usize, MatchResult)> = None;

        for text_idx in range {
            if !self.document.tokens()[text_idx].is_populated() {
                continue;
            }
            let candidate = self.score(timing_idx, text_idx);
            let replace = match &best {
                None => true,
                Some((best_idx, current)) => {
                    candidate.probability > current.probability + SCORE_EPSILON
                        || ((candidate.probability - current.probability).abs() <= SCORE_EPSILON
                            && prefer_on_tie(*best_idx, text_idx))
                }
            };
            if replace {
                best = Some((text_idx, candidate));
            }
        }

        best.map(|(_, result)| result).unwrap_or_else(MatchResult::none)
    }

    /// First token at or after `from` whose normalized word equals `word`.
    pub fn forward_exact_search(&self, word: &str, from: usize, limit: usize) -> Option<usize> {
        if word.is_empty() {
            return None;
        }
        self.document
            .tokens()
            .iter()
            .skip(from)
            .take(limit)
            .find(|token| token.normalized == word)
            .map(|token| token.index)
    }

    /// Exact word match closest to `guess` within `radius` on either side.
    pub fn nearest_exact(&self, word: &str, guess: usize, radius: usize) -> Option<usize> {
        if word.is_empty() || self.document.is_empty() {
            return None;
        }
        let start = guess.saturating_sub(radius);
        let end = (guess + radius + 1).min(self.document.len());
        (start..end)
            .filter(|&idx| self.document.word(idx) == word)
            .min_by_key(|&idx| (idx.abs_diff(guess), idx))
    }

    /// Map a timing index linearly into token-index space.
    pub fn interpolate_text_index(&self, timing_idx: usize) -> usize {
        let tokens = self.document.len();
        let events = self.timings.len();
        if tokens == 0 {
            return 0;
        }
        if events <= 1 {
            return 0;
        }
        let ratio = timing_idx.min(events - 1) as f64 / (events - 1) as f64;
        ((ratio * (tokens - 1) as f64).round() as usize).min(tokens - 1)
    }

    /// Reverse direction: which timing event was the token at `text_idx` spoken at?
    ///
    /// Only events with an identical normalized word are considered; ties go to
    /// the earliest event.
    pub fn best_timing_for_text(&self, text_idx: usize) -> Option<TimingMatch> {
        let word = self.document.word(text_idx);
        if word.is_empty() {
            return None;
        }
        let text_context = self.text_context(text_idx);
        let mut best: Option<TimingMatch> = None;

        for (timing_idx, event) in self.timings.iter().enumerate() {
            if event.normalized != word {
                continue;
            }
            let context_score = context_similarity(
                &self.audio_context(timing_idx),
                &text_context,
                self.config.set_overlap_weight,
                self.config.positional_weight,
            );
            if best.is_none_or(|current| context_score > current.context_score + SCORE_EPSILON) {
                best = Some(TimingMatch {
                    timing_index: timing_idx,
                    start_secs: event.start_secs,
                    probability: 0.5 + 0.5 * context_score,
                    context_score,
                });
            }
        }

        best
    }
}
