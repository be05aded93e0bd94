//! Reference text tokenization.
//!
//! A [`Document`] is the ordered token sequence the engine aligns against.
//! Indices are purely positional and stay stable for the document's lifetime;
//! the render surface is expected to expose one element per token, in the
//! same order.

use crate::normalizer::normalize_word;
use crate::text_utils::{split_paragraphs, split_words};
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub index: usize,
    /// Word as it appears in the text.
    pub display: String,
    /// Folded form used for every comparison; empty for punctuation-only words.
    pub normalized: String,
}

impl Token {
    /// Whether this token can take part in matching.
    pub fn is_populated(&self) -> bool {
        !self.normalized.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    tokens: Vec<Token>,
    paragraphs: Vec<Range<usize>>,
}

impl Document {
    /// Tokenize raw text; blank lines delimit paragraphs.
    pub fn from_text(text: &str) -> Self {
        let paragraphs = split_paragraphs(text)
            .iter()
            .map(|paragraph| split_words(paragraph))
            .collect();
        Self::from_paragraphs(paragraphs)
    }

    /// Build from text that was already split into words by an external tokenizer.
    pub fn from_paragraphs(paragraphs: Vec<Vec<String>>) -> Self {
        let mut tokens = Vec::new();
        let mut ranges = Vec::with_capacity(paragraphs.len());

        for words in paragraphs {
            if words.is_empty() {
                continue;
            }
            let start = tokens.len();
            for display in words {
                let normalized = normalize_word(&display);
                tokens.push(Token {
                    index: tokens.len(),
                    display,
                    normalized,
                });
            }
            ranges.push(start..tokens.len());
        }

        tracing::debug!(
            tokens = tokens.len(),
            paragraphs = ranges.len(),
            "Tokenized reference text"
        );
        Self {
            tokens,
            paragraphs: ranges,
        }
    }

    pub fn from_words<S: AsRef<str>>(words: &[S]) -> Self {
        Self::from_paragraphs(vec![
            words.iter().map(|word| word.as_ref().to_string()).collect(),
        ])
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Normalized word at `index`, or `""` when out of range.
    pub fn word(&self, index: usize) -> &str {
        self.tokens
            .get(index)
            .map(|token| token.normalized.as_str())
            .unwrap_or("")
    }

    pub fn paragraphs(&self) -> &[Range<usize>] {
        &self.paragraphs
    }

    /// Paragraph number containing the token at `index`.
    pub fn paragraph_of(&self, index: usize) -> Option<usize> {
        let pos = self
            .paragraphs
            .partition_point(|range| range.end <= index);
        self.paragraphs
            .get(pos)
            .filter(|range| range.contains(&index))
            .map(|_| pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_positional_across_paragraphs() {
        let doc = Document::from_text("The quick fox.\n\nIt ran — away!");
        let indices: Vec<usize> = doc.tokens().iter().map(|t| t.index).collect();
        assert_eq!(indices, (0..7).collect::<Vec<_>>());
        assert_eq!(doc.word(2), "fox");
        assert_eq!(doc.token(5).map(|t| t.display.as_str()), Some("—"));
        assert!(!doc.token(5).is_some_and(Token::is_populated));
        assert_eq!(doc.paragraphs(), &[0..3, 3..7]);
    }

    #[test]
    fn paragraph_lookup() {
        let doc = Document::from_text("a b\n\nc d e\n\nf");
        assert_eq!(doc.paragraph_of(0), Some(0));
        assert_eq!(doc.paragraph_of(2), Some(1));
        assert_eq!(doc.paragraph_of(4), Some(1));
        assert_eq!(doc.paragraph_of(5), Some(2));
        assert_eq!(doc.paragraph_of(6), None);
    }

    #[test]
    fn empty_text_has_no_tokens() {
        let doc = Document::from_text("  \n\n ");
        assert!(doc.is_empty());
        assert_eq!(doc.word(0), "");
    }
}
