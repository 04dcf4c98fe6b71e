// src/config.rs
//! Service configuration, loaded from `config/aggregator.toml` (path
//! overridable via `JOBWIRE_CONFIG_PATH`). Every field has a safe default;
//! a missing or malformed file never stops startup.

use serde::Deserialize;
use std::{fs, path::Path, time::Duration};

use crate::aggregate::cache::{AGGREGATE_TTL, INTERNSHIPS_TTL};
use crate::aggregate::dedup::MergePolicy;
use crate::aggregate::sources::{arbeitnow, remoteok};
use crate::sponsors::DEFAULT_SPONSOR_DATA_PATH;

pub const DEFAULT_CONFIG_PATH: &str = "config/aggregator.toml";
pub const ENV_CONFIG_PATH: &str = "JOBWIRE_CONFIG_PATH";

const DEFAULT_INTERNSHIPS_URL: &str =
    "https://raw.githubusercontent.com/SimplifyJobs/Summer2026-Internships/dev/README.md";

fn default_port() -> u16 {
    8080
}
fn default_fetch_timeout_secs() -> u64 {
    15
}
fn default_aggregate_ttl_minutes() -> u64 {
    AGGREGATE_TTL.as_secs() / 60
}
fn default_internships_ttl_minutes() -> u64 {
    INTERNSHIPS_TTL.as_secs() / 60
}
fn default_merge_policy() -> String {
    "first-seen".to_string()
}
fn default_remoteok_url() -> String {
    remoteok::DEFAULT_ENDPOINT.to_string()
}
fn default_arbeitnow_url() -> String {
    arbeitnow::DEFAULT_ENDPOINT.to_string()
}
fn default_internships_url() -> String {
    DEFAULT_INTERNSHIPS_URL.to_string()
}
fn default_sponsor_data_path() -> String {
    DEFAULT_SPONSOR_DATA_PATH.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    /// Budget for one upstream request, shared by every adapter.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub dedup: DedupSection,
    #[serde(default)]
    pub sources: SourcesSection,
    #[serde(default)]
    pub sponsors: SponsorsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_aggregate_ttl_minutes")]
    pub aggregate_ttl_minutes: u64,
    #[serde(default = "default_internships_ttl_minutes")]
    pub internships_ttl_minutes: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupSection {
    /// "first-seen" (compatible default) or "prefer-richer".
    #[serde(default = "default_merge_policy")]
    pub merge_policy: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourcesSection {
    #[serde(default = "default_remoteok_url")]
    pub remoteok_url: String,
    #[serde(default = "default_arbeitnow_url")]
    pub arbeitnow_url: String,
    #[serde(default = "default_internships_url")]
    pub internships_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SponsorsSection {
    #[serde(default = "default_sponsor_data_path")]
    pub data_path: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            cache: CacheSection::default(),
            dedup: DedupSection::default(),
            sources: SourcesSection::default(),
            sponsors: SponsorsSection::default(),
        }
    }
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            aggregate_ttl_minutes: default_aggregate_ttl_minutes(),
            internships_ttl_minutes: default_internships_ttl_minutes(),
        }
    }
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            merge_policy: default_merge_policy(),
        }
    }
}

impl Default for SourcesSection {
    fn default() -> Self {
        Self {
            remoteok_url: default_remoteok_url(),
            arbeitnow_url: default_arbeitnow_url(),
            internships_url: default_internships_url(),
        }
    }
}

impl Default for SponsorsSection {
    fn default() -> Self {
        Self {
            data_path: default_sponsor_data_path(),
        }
    }
}

impl AggregatorConfig {
    /// Load using env path override + default path fallback.
    pub fn load() -> Self {
        let path =
            std::env::var(ENV_CONFIG_PATH).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from_file(path)
    }

    /// Load configuration from a TOML file.
    /// Falls back to defaults on read or parse error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        let cfg = match fs::read_to_string(&path) {
            Ok(s) => toml::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    path = %path.as_ref().display(),
                    "config unreadable; using defaults"
                );
                Self::default()
            }),
            Err(_) => Self::default(),
        };
        cfg.sanitized()
    }

    /// Clamp nonsense values back to their defaults.
    fn sanitized(mut self) -> Self {
        if self.fetch_timeout_secs == 0 || self.fetch_timeout_secs > 120 {
            self.fetch_timeout_secs = default_fetch_timeout_secs();
        }
        if self.cache.aggregate_ttl_minutes == 0 {
            self.cache.aggregate_ttl_minutes = default_aggregate_ttl_minutes();
        }
        if self.cache.internships_ttl_minutes == 0 {
            self.cache.internships_ttl_minutes = default_internships_ttl_minutes();
        }
        self
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn aggregate_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.aggregate_ttl_minutes * 60)
    }

    pub fn internships_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.internships_ttl_minutes * 60)
    }

    /// "prefer-richer" opts into the richer-duplicate merge; anything else
    /// keeps the compatible first-seen behavior.
    pub fn merge_policy(&self) -> MergePolicy {
        match self.dedup.merge_policy.trim().to_lowercase().as_str() {
            "prefer-richer" | "prefer_richer" => MergePolicy::PreferRicher,
            _ => MergePolicy::FirstSeen,
        }
    }
}
