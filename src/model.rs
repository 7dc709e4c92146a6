//! Typed schemas for the schedule records and the channel registry.
//!
//! Everything read from disk or from the registry endpoint goes through these
//! types, so shape problems surface at ingestion instead of deep inside the
//! resolver.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EnrichError, EnrichResult};

/// Stream quality bucket. The five tiers and their wire names are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "4k")]
    Uhd,
    #[serde(rename = "1080p")]
    FullHd,
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "sd")]
    Sd,
    #[serde(rename = "unknown")]
    Unknown,
}

impl Quality {
    pub const ALL: [Quality; 5] = [
        Quality::Uhd,
        Quality::FullHd,
        Quality::Hd,
        Quality::Sd,
        Quality::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Uhd => "4k",
            Quality::FullHd => "1080p",
            Quality::Hd => "720p",
            Quality::Sd => "sd",
            Quality::Unknown => "unknown",
        }
    }
}

/// Links grouped by quality tier. Each tier is a set, so a URL can appear at
/// most once per tier; the same URL in two tiers is left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityLinks {
    #[serde(rename = "4k")]
    pub uhd: BTreeSet<String>,
    #[serde(rename = "1080p")]
    pub full_hd: BTreeSet<String>,
    #[serde(rename = "720p")]
    pub hd: BTreeSet<String>,
    pub sd: BTreeSet<String>,
    pub unknown: BTreeSet<String>,
}

impl QualityLinks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tier(&self, quality: Quality) -> &BTreeSet<String> {
        match quality {
            Quality::Uhd => &self.uhd,
            Quality::FullHd => &self.full_hd,
            Quality::Hd => &self.hd,
            Quality::Sd => &self.sd,
            Quality::Unknown => &self.unknown,
        }
    }

    pub fn tier_mut(&mut self, quality: Quality) -> &mut BTreeSet<String> {
        match quality {
            Quality::Uhd => &mut self.uhd,
            Quality::FullHd => &mut self.full_hd,
            Quality::Hd => &mut self.hd,
            Quality::Sd => &mut self.sd,
            Quality::Unknown => &mut self.unknown,
        }
    }

    /// Add a URL to a tier. Returns false when the tier already had it.
    pub fn insert(&mut self, quality: Quality, url: impl Into<String>) -> bool {
        self.tier_mut(quality).insert(url.into())
    }

    /// Tiers in their canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Quality, &BTreeSet<String>)> {
        Quality::ALL.into_iter().map(move |q| (q, self.tier(q)))
    }

    pub fn total_links(&self) -> usize {
        self.iter().map(|(_, urls)| urls.len()).sum()
    }
}

/// Local wall-clock kick-off as printed by the listings site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDate {
    /// `HH:MM`
    pub hour: String,
    /// `DD/MM/YYYY`
    pub day: String,
    #[serde(default)]
    pub zone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchDetails {
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub round: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamSide {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teams {
    #[serde(default)]
    pub local: TeamSide,
    #[serde(default)]
    pub visitor: TeamSide,
}

/// One scheduled event.
///
/// `links` is only ever set by the resolver. Fields this type does not know
/// about are kept in `extra` and written back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub sport: String,
    pub date: MatchDate,
    #[serde(default)]
    pub details: MatchDetails,
    #[serde(default)]
    pub teams: Option<Teams>,
    pub channels: Vec<String>,
    /// `None` when the key is absent; an explicit `null` is kept as
    /// `Some(Value::Null)` and written back.
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub event: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<QualityLinks>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A `{matches: [...]}` document, as produced per sport by the scraper and
/// as written after combination.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub matches: Vec<Match>,
}

/// Canonical broadcaster entry in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    pub links: QualityLinks,
}

/// Registry document: the endpoint response and the channel table this
/// service writes share the same shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSnapshot {
    pub channels: Vec<Channel>,
    #[serde(default)]
    pub total_channels: usize,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ChannelSnapshot {
    /// Parse and validate a registry document. Every entry must be a
    /// `{name, links}` record; the first offender is named in the error.
    pub fn from_json(body: &str) -> EnrichResult<Self> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> EnrichResult<Self> {
        let Value::Object(mut doc) = value else {
            return Err(EnrichError::InvalidRegistry(format!(
                "expected an object, found {}",
                json_kind(&value)
            )));
        };

        let channels = match doc.remove("channels") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(EnrichError::InvalidRegistry(format!(
                    "`channels` must be an array, found {}",
                    json_kind(&other)
                )))
            }
            None => {
                return Err(EnrichError::InvalidRegistry(
                    "missing `channels` array".to_string(),
                ))
            }
        };

        let channels = channels
            .into_iter()
            .enumerate()
            .map(|(index, item)| {
                serde_json::from_value::<Channel>(item).map_err(|e| {
                    EnrichError::InvalidRegistry(format!("channel at index {}: {}", index, e))
                })
            })
            .collect::<EnrichResult<Vec<_>>>()?;

        let total_channels = match doc.remove("totalChannels") {
            Some(v) => serde_json::from_value(v).map_err(|e| {
                EnrichError::InvalidRegistry(format!("`totalChannels`: {}", e))
            })?,
            None => channels.len(),
        };

        let last_updated = match doc.remove("lastUpdated") {
            Some(Value::Null) | None => None,
            Some(v) => Some(serde_json::from_value(v).map_err(|e| {
                EnrichError::InvalidRegistry(format!("`lastUpdated`: {}", e))
            })?),
        };

        Ok(Self {
            channels,
            total_channels,
            last_updated,
        })
    }
}

fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Validate a batch of match records. A single malformed record fails the
/// whole batch so the output stays positionally aligned with the input.
pub fn parse_matches(value: Value) -> EnrichResult<Vec<Match>> {
    let Value::Array(items) = value else {
        return Err(EnrichError::InvalidMatches(format!(
            "expected an array of matches, found {}",
            json_kind(&value)
        )));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Match>(item).map_err(|e| EnrichError::InvalidMatch {
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
