//! Similarity between a scraped label and a registry name.
//!
//! The score is the maximum of several overlapping heuristics (substring
//! containment, token Jaccard, token containment) with a veto for labels that
//! carry different channel numbers. The constants are policy, collected in
//! [`ScoringPolicy`], not derived from anything.

use std::collections::HashSet;
use std::sync::LazyLock;

use super::normalize::normalize;
use super::tokenize::{tokenize_normalized, Token, Vocabulary};

static DEFAULT_SCORER: LazyLock<Scorer> = LazyLock::new(Scorer::default);

/// Tunable constants of the scoring heuristic.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringPolicy {
    /// Weight of the length ratio in the substring containment bonus.
    pub containment_weight: f64,
    /// Floor added to any qualifying substring containment.
    pub containment_floor: f64,
    /// Shorter strings never earn a substring containment bonus.
    pub min_containment_len: usize,
    /// Added when numeric qualifiers are present and compatible.
    pub numeric_boost: f64,
    /// Upper bound for anything short of an exact normalized match.
    pub inexact_ceiling: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            containment_weight: 0.8,
            containment_floor: 0.2,
            min_containment_len: 5,
            numeric_boost: 0.05,
            inexact_ceiling: 0.99,
        }
    }
}

/// A name after normalization and tokenization, computed once and reused for
/// every comparison it takes part in.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedName {
    pub normalized: String,
    pub tokens: Vec<Token>,
}

impl PreparedName {
    fn token_set(&self) -> HashSet<&str> {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Numeric tokens keyed by value, so `01` and `1` agree.
    fn numeric_values(&self) -> HashSet<&str> {
        self.tokens
            .iter()
            .filter(|t| t.numeric)
            .map(|t| {
                let trimmed = t.text.trim_start_matches('0');
                if trimmed.is_empty() {
                    "0"
                } else {
                    trimmed
                }
            })
            .collect()
    }

    fn has_numeric(&self) -> bool {
        self.tokens.iter().any(|t| t.numeric)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scorer {
    vocabulary: Vocabulary,
    policy: ScoringPolicy,
}

impl Scorer {
    pub fn new(vocabulary: Vocabulary, policy: ScoringPolicy) -> Self {
        Self { vocabulary, policy }
    }

    pub fn prepare(&self, raw: &str) -> PreparedName {
        let normalized = normalize(raw);
        let tokens = tokenize_normalized(&normalized, &self.vocabulary);
        PreparedName { normalized, tokens }
    }

    /// Score two raw strings. Always within `[0, 1]`; exactly 1 only when
    /// both normalize to the same non-empty string.
    pub fn score(&self, label: &str, candidate: &str) -> f64 {
        self.score_prepared(&self.prepare(label), &self.prepare(candidate))
    }

    pub fn score_prepared(&self, label: &PreparedName, candidate: &PreparedName) -> f64 {
        let (a, b) = (label.normalized.as_str(), candidate.normalized.as_str());
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        if a == b {
            return 1.0;
        }

        let mut score = self
            .containment_bonus(a, b)
            .max(self.containment_bonus(b, a));

        if label.tokens.is_empty() || candidate.tokens.is_empty() {
            return self.clamp(score);
        }

        let label_numbers = label.numeric_values();
        let candidate_numbers = candidate.numeric_values();
        if !label_numbers.is_empty()
            && !candidate_numbers.is_empty()
            && label_numbers.is_disjoint(&candidate_numbers)
        {
            return 0.0;
        }

        let label_set = label.token_set();
        let candidate_set = candidate.token_set();
        let intersection = label_set.intersection(&candidate_set).count() as f64;
        let union = label_set.union(&candidate_set).count() as f64;

        if union > 0.0 {
            score = score.max(intersection / union);
        }

        let smaller = label_set.len().min(candidate_set.len()) as f64;
        score = score.max(intersection / smaller);

        if label.has_numeric() || candidate.has_numeric() {
            score += self.policy.numeric_boost;
        }

        self.clamp(score)
    }

    /// Bonus for `needle` appearing verbatim inside `haystack`.
    fn containment_bonus(&self, needle: &str, haystack: &str) -> f64 {
        if needle.len() < self.policy.min_containment_len || !haystack.contains(needle) {
            return 0.0;
        }
        let ratio = needle.len() as f64 / haystack.len() as f64;
        self.policy.containment_weight * ratio + self.policy.containment_floor
    }

    fn clamp(&self, score: f64) -> f64 {
        score.clamp(0.0, self.policy.inexact_ceiling.max(0.0).min(1.0))
    }
}

/// Score with the default vocabulary and policy.
pub fn score(label: &str, candidate: &str) -> f64 {
    DEFAULT_SCORER.score(label, candidate)
}
