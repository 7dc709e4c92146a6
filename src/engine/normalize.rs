//! Label canonicalization.
//!
//! Scraped labels and registry names are both run through [`normalize`]
//! before any comparison, so the two vocabularies meet on the same ground:
//! lowercase ASCII letters, digits and single spaces.

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Broadcaster shorthands expanded before folding. Order matters: `M+` and
/// `m plus` must be consumed before the lone `m` rule sees them.
/// `plus`, `rtve` and `mitele` are intentionally not rewritten.
static RAW_REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"(?i)\bm\+").expect("Invalid regex"), " movistar plus "),
        (Regex::new(r"(?i)\bm plus\b").expect("Invalid regex"), "movistar plus"),
        (Regex::new(r"(?i)\bm\b").expect("Invalid regex"), "movistar"),
        (Regex::new(r"(?i)\bmovistarplus\b").expect("Invalid regex"), "movistar plus"),
    ]
});

/// Word-level rewrites re-applied to folded text. Folding can expose a bare
/// `m` token that was glued to punctuation or carried an accent in the raw
/// label (`m_x`, `ḿ`); without this pass `normalize` would not be idempotent.
static FOLDED_REWRITES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"\bm plus\b").expect("Invalid regex"), "movistar plus"),
        (Regex::new(r"\bm\b").expect("Invalid regex"), "movistar"),
        (Regex::new(r"\bmovistarplus\b").expect("Invalid regex"), "movistar plus"),
    ]
});

static RE_NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("Invalid regex"));

/// Canonicalize a raw label.
///
/// Pipeline:
/// 1. Expand broadcaster shorthands (`M+`, `m plus`, lone `m`, `movistarplus`)
/// 2. Lowercase
/// 3. NFD-decompose and drop combining marks
/// 4. Replace every run of non `[a-z0-9]` characters with a space
/// 5. Trim and collapse whitespace
///
/// Total and idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let expanded = apply_rewrites(&RAW_REWRITES, raw);
    let folded = fold(&expanded);
    let rewritten = apply_rewrites(&FOLDED_REWRITES, &folded);
    collapse_whitespace(&rewritten)
}

/// Lowercase and strip diacritics, keeping base letters.
pub(crate) fn strip_diacritics(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect()
}

fn fold(text: &str) -> String {
    let bare = strip_diacritics(text);
    let spaced = RE_NON_ALNUM.replace_all(&bare, " ");
    collapse_whitespace(&spaced)
}

fn apply_rewrites(rules: &[(Regex, &'static str)], text: &str) -> String {
    let mut out = text.to_string();
    for (pattern, replacement) in rules {
        if pattern.is_match(&out) {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }
    }
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
