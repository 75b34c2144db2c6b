//! Word tokenizer

/// A word and its byte span in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    /// Word text
    pub text: &'a str,
    /// Byte offset of the first character
    pub start: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '_'
}

/// Split text into words
///
/// Words are runs of alphanumeric characters, apostrophes and underscores.
/// Whitespace and other punctuation separate words and are dropped.
#[must_use]
pub fn tokenize(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    for (i, c) in text.char_indices() {
        match (is_word_char(c), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                tokens.push(Token { text: &text[s..i], start: s });
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(Token { text: &text[s..], start: s });
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(text: &str) -> Vec<&str> {
        tokenize(text).into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn splits_on_whitespace_and_punctuation() {
        assert_eq!(words("The cat, the hat."), vec!["The", "cat", "the", "hat"]);
        assert_eq!(words("  don't-stop  "), vec!["don't", "stop"]);
        assert!(words("...").is_empty());
    }

    #[test]
    fn keeps_byte_offsets() {
        let tokens = tokenize("é cat");
        assert_eq!(tokens[1], Token { text: "cat", start: 3 });
    }
}
