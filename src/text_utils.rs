//! Text splitting helpers for read-along alignment.

/// Split text into paragraphs separated by blank lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut buffer = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            if !buffer.is_empty() {
                paragraphs.push(buffer.join("\n"));
                buffer.clear();
            }
        } else {
            buffer.push(line);
        }
    }

    if !buffer.is_empty() {
        paragraphs.push(buffer.join("\n"));
    }

    paragraphs
}

/// Split a paragraph into display words (whitespace separated, punctuation kept).
pub fn split_words(paragraph: &str) -> Vec<String> {
    paragraph.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_delimit_paragraphs() {
        let text = "First line\ncontinues.\n\n\n  \nSecond one.\n";
        let paragraphs = split_paragraphs(text);
        assert_eq!(paragraphs, vec!["First line\ncontinues.", "Second one."]);
    }

    #[test]
    fn words_keep_punctuation() {
        assert_eq!(split_words(" Hi, there!  "), vec!["Hi,", "there!"]);
    }
}
