//! Word normalization shared by the reference text and the timing stream.
//!
//! Both pipelines must fold words the same way or exact matches are lost:
//! compatibility-fold (NFKC), lowercase, then drop every non-word character.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static RE_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\W+").unwrap());

/// Normalize a single word. Returns an empty string for pure punctuation.
pub fn normalize_word(word: &str) -> String {
    let folded: String = word.nfkc().collect();
    let lowered = folded.to_lowercase();
    RE_NON_WORD.replace_all(&lowered, "").into_owned()
}

/// Whitespace split followed by per-word normalization; empty results kept.
pub fn normalize_words(text: &str) -> Vec<String> {
    text.split_whitespace().map(normalize_word).collect()
}
