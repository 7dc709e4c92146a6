//! Per-tier link merging and the registry-wide channel table.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

use super::normalize::strip_diacritics;
use super::resolve::EnrichedMatch;
use crate::model::{Channel, ChannelSnapshot, QualityLinks};

impl QualityLinks {
    /// Add every URL of `source` to the same tier here. Tiers are
    /// independent sets. Returns how many URLs were new.
    pub fn merge(&mut self, source: &QualityLinks) -> usize {
        let mut added = 0;
        for (quality, urls) in source.iter() {
            let tier = self.tier_mut(quality);
            for url in urls {
                if tier.insert(url.clone()) {
                    added += 1;
                }
            }
        }
        added
    }

    pub fn has_any_links(&self) -> bool {
        self.iter().any(|(_, urls)| !urls.is_empty())
    }
}

/// Merge `source` into `target` in place.
pub fn merge(target: &mut QualityLinks, source: &QualityLinks) {
    target.merge(source);
}

pub fn has_any_links(links: &QualityLinks) -> bool {
    links.has_any_links()
}

/// Canonical channel name → union of the links of every match that
/// resolved to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelTable {
    entries: HashMap<String, QualityLinks>,
}

impl ChannelTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from a resolved batch. Matches without links add
    /// nothing. Workers build partial tables that are merged at the end, so
    /// no accumulator is shared between threads.
    pub fn from_enriched(batch: &[EnrichedMatch]) -> Self {
        batch
            .par_iter()
            .fold(ChannelTable::new, |mut table, enriched| {
                table.add_match(enriched);
                table
            })
            .reduce(ChannelTable::new, |mut left, right| {
                left.absorb(right);
                left
            })
    }

    pub fn add_match(&mut self, enriched: &EnrichedMatch) {
        let Some(links) = enriched.record.links.as_ref() else {
            return;
        };
        for name in &enriched.resolved_channels {
            self.add(name, links);
        }
    }

    pub fn add(&mut self, name: &str, links: &QualityLinks) {
        match self.entries.get_mut(name) {
            Some(existing) => {
                existing.merge(links);
            }
            None => {
                self.entries.insert(name.to_string(), links.clone());
            }
        }
    }

    /// Fold another partial table into this one.
    pub fn absorb(&mut self, other: ChannelTable) {
        for (name, links) in other.entries {
            self.add(&name, &links);
        }
    }

    pub fn get(&self, name: &str) -> Option<&QualityLinks> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_links(&self) -> usize {
        self.entries.values().map(QualityLinks::total_links).sum()
    }

    /// Snapshot sorted by channel name. URLs are already held in sorted
    /// sets, so the output is reproducible for a given input.
    pub fn into_snapshot(self, last_updated: DateTime<Utc>) -> ChannelSnapshot {
        let mut channels: Vec<Channel> = self
            .entries
            .into_iter()
            .map(|(name, links)| Channel { name, links })
            .collect();
        channels.sort_by(|a, b| locale_cmp(&a.name, &b.name));

        ChannelSnapshot {
            total_channels: channels.len(),
            channels,
            last_updated: Some(last_updated),
        }
    }
}

/// Collation-style comparison: accents and case only break ties.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    strip_diacritics(a)
        .cmp(&strip_diacritics(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}
