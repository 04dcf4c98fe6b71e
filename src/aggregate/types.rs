// src/aggregate/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Visa-sponsorship signal declared by the source itself, distinct from the
/// registry-derived assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SponsorshipHint {
    #[default]
    Unknown,
    Offers,
    NoSponsorship,
    RequiresCitizenship,
}

impl SponsorshipHint {
    /// Whether the source stated intent at all. Declared intent is
    /// authoritative over registry history.
    pub fn is_declared(self) -> bool {
        self != SponsorshipHint::Unknown
    }
}

/// Canonical job record, the one shape every source adapter maps into.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct JobPosting {
    /// Source-prefixed id, unique within one aggregation cycle.
    pub id: String,
    pub title: String,
    pub company: String,
    /// Free text; may become a comma-joined union of observed locations.
    pub location: String,
    pub salary: Option<String>,
    /// Small open vocabulary: "Internship", "Full-time", "Remote", "Contract".
    pub job_type: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub logo_url: Option<String>,
    pub apply_url: String,
    pub posted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Adapter identifier, e.g. "remoteok".
    pub source: String,
    #[serde(default)]
    pub sponsorship: SponsorshipHint,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// One external job source. Adapters report their own failures; the cycle
/// runner absorbs them into an empty contribution so a single bad source
/// never fails a whole aggregation cycle.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<JobPosting>>;
    fn name(&self) -> &'static str;
}
