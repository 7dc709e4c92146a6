//! Threshold-gated resolution of match labels against the channel registry.

use rayon::prelude::*;
use tracing::debug;

use super::score::{PreparedName, Scorer};
use crate::model::{Channel, Match, QualityLinks};

/// Minimum score for a registry entry to be accepted for a label.
pub const MATCH_THRESHOLD: f64 = 0.45;

/// Best registry entry found for one label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate<'r> {
    pub channel: &'r Channel,
    pub score: f64,
}

/// What happened to one label of a match.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOutcome<'r> {
    pub label: String,
    /// Best-scoring entry, whether or not it cleared the threshold.
    pub best: Option<Candidate<'r>>,
    pub accepted: bool,
}

/// Links collected for a match plus the per-label decisions behind them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution<'r> {
    pub links: QualityLinks,
    pub outcomes: Vec<LabelOutcome<'r>>,
}

impl<'r> Resolution<'r> {
    /// Registry names that were accepted, first occurrence order, no repeats.
    pub fn resolved_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for outcome in self.outcomes.iter().filter(|o| o.accepted) {
            if let Some(candidate) = outcome.best {
                if !names.iter().any(|n| n == &candidate.channel.name) {
                    names.push(candidate.channel.name.clone());
                }
            }
        }
        names
    }
}

/// A match after resolution, with the registry names its labels resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedMatch {
    pub record: Match,
    pub resolved_channels: Vec<String>,
}

/// Resolves labels against one registry snapshot.
///
/// Registry names are normalized and tokenized once up front; the registry
/// itself is only borrowed and never modified.
pub struct Resolver<'r> {
    registry: &'r [Channel],
    prepared: Vec<PreparedName>,
    scorer: Scorer,
    threshold: f64,
}

impl<'r> Resolver<'r> {
    pub fn new(registry: &'r [Channel]) -> Self {
        Self::with_scorer(registry, Scorer::default())
    }

    pub fn with_scorer(registry: &'r [Channel], scorer: Scorer) -> Self {
        let prepared = registry
            .iter()
            .map(|channel| scorer.prepare(&channel.name))
            .collect();
        Self {
            registry,
            prepared,
            scorer,
            threshold: MATCH_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Highest-scoring entry for `label`, ignoring the threshold.
    ///
    /// Entries are scanned in registry order and only a strictly higher score
    /// replaces the current best, so the earliest entry wins ties and an
    /// entry scoring 0 is never returned.
    pub fn best_candidate(&self, label: &str) -> Option<Candidate<'r>> {
        let prepared_label = self.scorer.prepare(label);
        let mut best: Option<Candidate<'r>> = None;

        for (channel, prepared) in self.registry.iter().zip(&self.prepared) {
            let score = self.scorer.score_prepared(&prepared_label, prepared);
            let current = best.map(|c| c.score).unwrap_or(0.0);
            if score > current {
                best = Some(Candidate { channel, score });
            }
        }

        best
    }

    /// Best entry for `label` if it clears the threshold.
    pub fn resolve_label(&self, label: &str) -> Option<Candidate<'r>> {
        self.best_candidate(label)
            .filter(|candidate| candidate.score >= self.threshold)
    }

    /// Resolve every label of a match, in order. Repeated labels are scored
    /// again; the per-tier sets absorb the duplicates.
    pub fn resolve(&self, record: &Match) -> Resolution<'r> {
        let mut resolution = Resolution::default();

        for label in &record.channels {
            let best = self.best_candidate(label);
            let accepted = matches!(best, Some(c) if c.score >= self.threshold);

            match best {
                Some(candidate) if accepted => {
                    debug!(
                        label = %label,
                        channel = %candidate.channel.name,
                        score = candidate.score,
                        "label resolved"
                    );
                    resolution.links.merge(&candidate.channel.links);
                }
                Some(candidate) => {
                    debug!(
                        label = %label,
                        closest = %candidate.channel.name,
                        score = candidate.score,
                        "label below threshold"
                    );
                }
                None => {
                    debug!(label = %label, "label matched nothing");
                }
            }

            resolution.outcomes.push(LabelOutcome {
                label: label.clone(),
                best,
                accepted,
            });
        }

        resolution
    }

    /// Attach links to a match. `links` is always replaced: set when
    /// something was collected, cleared otherwise, so "nothing matched" stays
    /// distinguishable from an empty link set.
    pub fn enrich(&self, mut record: Match) -> EnrichedMatch {
        let resolution = self.resolve(&record);
        let resolved_channels = resolution.resolved_names();
        record.links = resolution
            .links
            .has_any_links()
            .then_some(resolution.links);
        EnrichedMatch {
            record,
            resolved_channels,
        }
    }

    /// Enrich a whole batch in parallel. Output order matches input order.
    pub fn enrich_all(&self, batch: Vec<Match>) -> Vec<EnrichedMatch> {
        batch
            .into_par_iter()
            .map(|record| self.enrich(record))
            .collect()
    }
}

/// Collect the links for one match with the default scorer.
pub fn resolve(record: &Match, registry: &[Channel], threshold: f64) -> QualityLinks {
    Resolver::new(registry)
        .with_threshold(threshold)
        .resolve(record)
        .links
}
