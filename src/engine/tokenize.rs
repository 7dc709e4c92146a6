//! Splitting normalized labels into comparable tokens.

use std::collections::{HashMap, HashSet};

use super::normalize::normalize;

/// Function words and generic terms that say nothing about which
/// broadcaster a label refers to.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "de", "del", "la", "el", "los", "las", "y", "en", "con", "por", "para", "the", "tv", "canal",
];

/// Spelling variants folded onto one canonical token.
pub const DEFAULT_CANONICAL_TOKENS: &[(&str, &str)] = &[
    ("movistarplus", "movistar"),
    ("movistar", "movistar"),
    ("plus", "plus"),
    ("mplus", "movistar"),
    ("mitele", "mitele"),
];

/// Lookup tables used by the tokenizer.
///
/// Held as plain data so a test (or a different listings source) can swap
/// them without touching the scoring code.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    stop_words: HashSet<String>,
    canonical: HashMap<String, String>,
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::new(
            DEFAULT_STOP_WORDS.iter().copied(),
            DEFAULT_CANONICAL_TOKENS.iter().copied(),
        )
    }
}

impl Vocabulary {
    pub fn new<'a>(
        stop_words: impl IntoIterator<Item = &'a str>,
        canonical: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        Self {
            stop_words: stop_words.into_iter().map(str::to_lowercase).collect(),
            canonical: canonical
                .into_iter()
                .map(|(from, to)| (from.to_lowercase(), to.to_lowercase()))
                .collect(),
        }
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.contains(token)
    }

    pub fn canonicalize<'t>(&'t self, token: &'t str) -> &'t str {
        self.canonical.get(token).map(String::as_str).unwrap_or(token)
    }
}

/// A surviving token and whether it is purely numeric (`^[0-9]+$`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub numeric: bool,
}

impl Token {
    fn new(text: &str) -> Self {
        Self {
            numeric: !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()),
            text: text.to_string(),
        }
    }
}

/// Tokenize a raw label: normalize, canonicalize variants, drop stop words.
/// Order and duplicates are kept.
pub fn tokenize(raw: &str, vocabulary: &Vocabulary) -> Vec<Token> {
    tokenize_normalized(&normalize(raw), vocabulary)
}

/// Same as [`tokenize`] for text that already went through `normalize`.
pub fn tokenize_normalized(normalized: &str, vocabulary: &Vocabulary) -> Vec<Token> {
    normalized
        .split(' ')
        .map(|token| vocabulary.canonicalize(token))
        .filter(|token| !token.is_empty() && !vocabulary.is_stop_word(token))
        .map(Token::new)
        .collect()
}
