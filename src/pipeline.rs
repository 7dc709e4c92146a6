//! One enrichment pass end to end, and the polling loop around it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info};

use crate::combine::combine_dir;
use crate::config::Config;
use crate::engine::{ChannelTable, EnrichedMatch, Resolver};
use crate::health::HealthState;
use crate::model::{Channel, ChannelSnapshot, Match, Schedule};
use crate::registry::RegistryClient;

pub const ALL_MATCHES_FILE: &str = "allMatches.json";
pub const UPDATED_MATCHES_FILE: &str = "updatedMatches.json";
pub const UPDATED_CHANNELS_FILE: &str = "updatedChannels.json";

/// Counts reported after a successful pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub matches: usize,
    pub linked_matches: usize,
    pub channels: usize,
    pub links: usize,
}

/// Everything a pass produces, before anything is written.
#[derive(Debug, Clone)]
pub struct EnrichmentOutput {
    pub matches: Vec<Match>,
    pub channels: ChannelSnapshot,
}

impl EnrichmentOutput {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            matches: self.matches.len(),
            linked_matches: self.matches.iter().filter(|m| m.links.is_some()).count(),
            channels: self.channels.channels.len(),
            links: self
                .channels
                .channels
                .iter()
                .map(|c| c.links.total_links())
                .sum(),
        }
    }
}

/// Resolve a batch against a registry and build the channel table.
/// Pure: no I/O, safe to call from tests.
pub fn enrich_batch(matches: Vec<Match>, registry: &[Channel]) -> EnrichmentOutput {
    let resolver = Resolver::new(registry);
    let enriched: Vec<EnrichedMatch> = resolver.enrich_all(matches);
    let table = ChannelTable::from_enriched(&enriched);

    EnrichmentOutput {
        matches: enriched.into_iter().map(|e| e.record).collect(),
        channels: table.into_snapshot(Utc::now()),
    }
}

/// Link enrichment service
pub struct EnrichmentService {
    config: Config,
    registry: RegistryClient,
    pub health: HealthState,
}

impl EnrichmentService {
    pub fn new(config: Config) -> Result<Self> {
        let registry = RegistryClient::new(
            config.registry_url.clone(),
            config.registry_requests_per_minute,
            config.registry_max_retries,
        )?;

        Ok(Self {
            config,
            registry,
            health: HealthState::new(),
        })
    }

    /// Single pass: combine → fetch registry → resolve → write outputs.
    ///
    /// Outputs are only written once every step has succeeded, so a bad
    /// input never leaves a half-updated data directory.
    pub async fn run_once(&self) -> Result<RunSummary> {
        let pre_data_dir = self.config.pre_data_dir.clone();
        let schedule = tokio::task::spawn_blocking(move || combine_dir(&pre_data_dir))
            .await
            .context("Schedule combination task panicked")??;

        let registry = self.registry.fetch().await?;

        let matches = schedule.matches.clone();
        let output = tokio::task::spawn_blocking(move || enrich_batch(matches, &registry.channels))
            .await
            .context("Enrichment task panicked")?;

        let summary = output.summary();
        write_outputs(&self.config.data_dir, &schedule, &output)?;

        info!(
            "Enriched {}/{} matches, {} channels with {} links",
            summary.linked_matches, summary.matches, summary.channels, summary.links
        );
        Ok(summary)
    }

    /// Main polling loop
    pub async fn run(&self) -> Result<()> {
        info!(
            "Starting enrichment loop (poll interval: {}s)",
            self.config.poll_interval_seconds
        );

        loop {
            let start = std::time::Instant::now();

            match self.run_once().await {
                Ok(summary) => {
                    self.health.record_success(summary).await;
                    info!("Run completed in {:?}", start.elapsed());
                }
                Err(e) => {
                    self.health.record_error().await;
                    error!("Run failed: {:?}", e);
                }
            }

            tokio::time::sleep(Duration::from_secs(self.config.poll_interval_seconds)).await;
        }
    }
}

/// Write the three pipeline files into `data_dir`.
pub fn write_outputs(data_dir: &Path, schedule: &Schedule, output: &EnrichmentOutput) -> Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    // Serialize everything first so a serialization failure writes nothing
    let all_matches = serde_json::to_vec_pretty(schedule).context("Failed to serialize schedule")?;
    let updated_matches =
        serde_json::to_vec_pretty(&output.matches).context("Failed to serialize matches")?;
    let updated_channels =
        serde_json::to_vec_pretty(&output.channels).context("Failed to serialize channels")?;

    write_atomic(&data_dir.join(ALL_MATCHES_FILE), &all_matches)?;
    write_atomic(&data_dir.join(UPDATED_MATCHES_FILE), &updated_matches)?;
    write_atomic(&data_dir.join(UPDATED_CHANNELS_FILE), &updated_channels)?;
    Ok(())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = PathBuf::from(path);
    tmp.set_extension("json.tmp");
    std::fs::write(&tmp, bytes).with_context(|| format!("Failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("Failed to move {} into place", path.display()))?;
    info!("Saved {}", path.display());
    Ok(())
}
