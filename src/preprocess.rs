//! Text normalization and tokenization for poem input.
//!
//! Persian input arrives with mixed Arabic/Persian letter forms, ornamental
//! quote marks and irregular whitespace. Normalization unifies the letter
//! forms, strips the quotes, isolates punctuation and collapses whitespace;
//! tokenization then splits on whitespace. Punctuation marks survive as
//! standalone single-char tokens, which the mappers render as connector dots.

use once_cell::sync::Lazy;
use regex::Regex;

static QUOTES: Lazy<Regex> = Lazy::new(|| Regex::new("[«»\"]").expect("static regex"));
static PUNCT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([،؛؟!?.,;:])").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalize poem text: unify Arabic yeh/kaf to their Persian forms, strip
/// quote marks, pad punctuation with spaces, collapse whitespace.
pub fn normalize_text(text: &str) -> String {
    let unified: String = text
        .chars()
        .map(|c| match c {
            'ي' => 'ی',
            'ك' => 'ک',
            c => c,
        })
        .collect();
    let stripped = QUOTES.replace_all(&unified, "");
    let isolated = PUNCT.replace_all(&stripped, " ${1} ");
    let collapsed = WHITESPACE.replace_all(&isolated, " ");
    collapsed.trim().to_string()
}

/// Split normalized text into word tokens. Never yields empty tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize_text(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unifies_arabic_letter_forms() {
        assert_eq!(normalize_text("علي ملك"), "علی ملک");
    }

    #[test]
    fn strips_quote_marks() {
        assert_eq!(normalize_text("«سلام» \"دنیا\""), "سلام دنیا");
    }

    #[test]
    fn collapses_whitespace() {
        assert_eq!(normalize_text("  بسی   رنج \n بردم  "), "بسی رنج بردم");
    }

    #[test]
    fn punctuation_becomes_standalone_tokens() {
        let tokens = tokenize("ای دوست، بیا!");
        assert_eq!(tokens, vec!["ای", "دوست", "،", "بیا", "!"]);
    }

    #[test]
    fn tokenize_never_yields_empty_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \n\t ").is_empty());
        for t in tokenize("، ، ،") {
            assert!(!t.is_empty());
        }
    }

    #[test]
    fn tokenize_splits_verse() {
        let tokens = tokenize("بسی رنج بردم در این سال سی");
        assert_eq!(
            tokens,
            vec!["بسی", "رنج", "بردم", "در", "این", "سال", "سی"]
        );
    }
}
