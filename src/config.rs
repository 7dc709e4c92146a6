use std::env;
use std::path::PathBuf;

use anyhow::{anyhow, Result};

pub const DEFAULT_REGISTRY_URL: &str = "https://elplan.vercel.app/api/channels";

/// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub registry_url: String,
    /// Per-sport schedule files produced by the scraper
    pub pre_data_dir: PathBuf,
    /// Where allMatches / updatedMatches / updatedChannels are written
    pub data_dir: PathBuf,
    pub poll_interval_seconds: u64,
    pub health_port: u16,
    /// If true, run once and exit (no polling loop)
    pub run_once: bool,
    pub registry_max_retries: u32,
    pub registry_requests_per_minute: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let registry_url = match env::var("REGISTRY_URL") {
            Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
            Ok(_) => return Err(anyhow!("REGISTRY_URL is set but empty")),
            Err(_) => DEFAULT_REGISTRY_URL.to_string(),
        };
        if !registry_url.starts_with("http://") && !registry_url.starts_with("https://") {
            return Err(anyhow!(
                "REGISTRY_URL must be an http(s) URL, got '{}'",
                registry_url
            ));
        }

        let pre_data_dir = dir_var("PRE_DATA_DIR", "./preData")?;
        let data_dir = dir_var("DATA_DIR", "./data")?;

        Ok(Self {
            registry_url,
            pre_data_dir,
            data_dir,
            poll_interval_seconds: parse_var("POLL_INTERVAL_SECONDS", 3600),
            health_port: parse_var("HEALTH_PORT", 8084),
            run_once: env::var("RUN_ONCE")
                .unwrap_or_else(|_| "false".to_string())
                .to_lowercase()
                == "true",
            registry_max_retries: parse_var("REGISTRY_MAX_RETRIES", 5u32).max(1),
            registry_requests_per_minute: parse_var("REGISTRY_REQUESTS_PER_MINUTE", 30u32).max(1),
        })
    }
}

fn dir_var(name: &str, default: &str) -> Result<PathBuf> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(PathBuf::from(v.trim())),
        Ok(_) => Err(anyhow!("{} is set but empty", name)),
        Err(_) => Ok(PathBuf::from(default)),
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
