//! Merge the per-sport schedule files into one chronologically sorted batch.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value;
use tracing::{info, warn};

use crate::model::{json_kind, parse_matches, Match, MatchDate, Schedule};

/// Kick-off as a naive local date-time. `zone` is not applied; every listing
/// on the source site shares one zone.
pub fn kickoff(date: &MatchDate) -> Option<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(date.day.trim(), "%d/%m/%Y").ok()?;
    let time = NaiveTime::parse_from_str(date.hour.trim(), "%H:%M").ok()?;
    Some(day.and_time(time))
}

/// Stable sort by kick-off. Records with an unreadable date go last, in
/// their original relative order.
pub fn sort_by_kickoff(matches: &mut [Match]) {
    matches.sort_by_key(|m| {
        let at = kickoff(&m.date);
        (at.is_none(), at)
    });
}

/// Read every `*.json` schedule in `dir` (file name order), concatenate
/// their `matches` arrays and sort the result by kick-off.
///
/// A file without a `matches` array is skipped. A malformed match record in
/// any file fails the whole combination.
pub fn combine_dir(dir: &Path) -> Result<Schedule> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read schedule directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();

    let mut matches = Vec::new();
    for path in &files {
        match read_schedule_file(path)? {
            Some(mut batch) => {
                info!("Loaded {} matches from {}", batch.len(), path.display());
                matches.append(&mut batch);
            }
            None => {
                warn!("Skipping {}: no `matches` array", path.display());
            }
        }
    }

    sort_by_kickoff(&mut matches);
    info!(
        "Combined {} matches from {} schedule files",
        matches.len(),
        files.len()
    );

    Ok(Schedule { matches })
}

fn read_schedule_file(path: &Path) -> Result<Option<Vec<Match>>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let doc: Value = serde_json::from_str(&body)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let Value::Object(mut doc) = doc else {
        return Err(anyhow!(
            "{}: expected a schedule object, found {}",
            path.display(),
            json_kind(&doc)
        ));
    };

    match doc.remove("matches") {
        Some(items @ Value::Array(_)) => {
            let batch = parse_matches(items)
                .with_context(|| format!("Invalid schedule file {}", path.display()))?;
            Ok(Some(batch))
        }
        _ => Ok(None),
    }
}
