//! Reverse lookup: find where a free-text passage sits in the reference text
//! and which audio timestamp it was spoken at.

use crate::matcher::{ContextMatcher, context_similarity};
use crate::normalizer::normalize_words;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocateResult {
    /// First token of the matched window.
    pub start: usize,
    /// One past the last token of the matched window.
    pub end: usize,
    pub probability: f64,
    /// Where playback should seek to reach the passage.
    pub timestamp_secs: f64,
    /// Confidence of the timestamp; `None` when it was estimated from the speaking rate.
    pub timing_probability: Option<f64>,
}

pub struct ParagraphLocator<'a> {
    matcher: ContextMatcher<'a>,
}

impl<'a> ParagraphLocator<'a> {
    pub fn new(matcher: ContextMatcher<'a>) -> Self {
        Self { matcher }
    }

    /// Locate using the configured minimum probability.
    pub fn locate(&self, text: &str) -> Option<LocateResult> {
        self.locate_with_min(text, self.matcher.config().locate_min_probability)
    }

    pub fn locate_with_min(&self, text: &str, min_probability: f64) -> Option<LocateResult> {
        let query: Vec<String> = normalize_words(text)
            .into_iter()
            .filter(|word| !word.is_empty())
            .collect();
        let query: Vec<&str> = query.iter().map(String::as_str).collect();
        let document = self.matcher.document();
        let n = query.len();
        if n == 0 || n > document.len() {
            debug!(query_words = n, tokens = document.len(), "Locate query cannot fit");
            return None;
        }

        let (start, probability) = self.best_window(&query)?;
        if probability < min_probability {
            debug!(start, probability, min_probability, "Best locate window below threshold");
            return None;
        }

        let (timestamp_secs, timing_probability) = self.timestamp_for(start, start + n);
        info!(
            start,
            end = start + n,
            probability,
            timestamp_secs,
            "Located passage"
        );
        Some(LocateResult {
            start,
            end: start + n,
            probability,
            timestamp_secs,
            timing_probability,
        })
    }

    /// Highest-scoring window start; ties go to the earliest window.
    fn best_window(&self, query: &[&str]) -> Option<(usize, f64)> {
        let config = self.matcher.config();
        let document = self.matcher.document();
        let n = query.len();
        let radius = config.context_radius;
        let mut best: Option<(usize, f64)> = None;

        for start in 0..=document.len() - n {
            let end = start + n;
            let window = self.matcher.window_words(start..end, None);
            if (window.len() as f64) / (n as f64) < config.min_populated_ratio {
                continue;
            }
            let direct = context_similarity(
                query,
                &window,
                config.set_overlap_weight,
                config.positional_weight,
            );
            let mut surrounding = self
                .matcher
                .window_words(start.saturating_sub(radius)..start, None);
            surrounding.extend(self.matcher.window_words(end..end + radius, None));
            let context = context_similarity(
                query,
                &surrounding,
                config.set_overlap_weight,
                config.positional_weight,
            );
            let score =
                config.locate_direct_weight * direct + config.locate_context_weight * context;
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((start, score));
            }
        }
        best
    }

    fn timestamp_for(&self, start: usize, end: usize) -> (f64, Option<f64>) {
        let first_word = (start..end).find(|&idx| !self.matcher.document().word(idx).is_empty());
        if let Some(found) = first_word.and_then(|idx| self.matcher.best_timing_for_text(idx)) {
            return (found.start_secs, Some(found.probability));
        }
        let rate = self.matcher.config().fallback_words_per_sec;
        (start as f64 / rate, None)
    }
}
