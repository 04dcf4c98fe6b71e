//! # Sponsor Registry
//!
//! Static reference dataset of organizations with historical visa-sponsorship
//! filing statistics, used for fuzzy-matched enrichment of job postings.
//!
//! - Loads from JSON config (records + precomputed name variants).
//! - Lookup walks the registry in order; the first matching entry wins.
//! - An entry matches when the query and a candidate name are substrings of
//!   each other, share a first token, or contain each other once legal-entity
//!   suffixes are stripped.
//! - A hint the source itself declared on the posting overrides any registry
//!   result: declared intent beats inferred history.
//! - Includes a built-in `default_seed()` with high-volume sponsors, used as
//!   fallback if no data file is found.
//!
//! Loaded once at startup and never mutated afterwards.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::aggregate::types::{JobPosting, SponsorshipHint};

pub const DEFAULT_SPONSOR_DATA_PATH: &str = "config/sponsors.json";
pub const ENV_SPONSOR_DATA_PATH: &str = "SPONSOR_DATA_PATH";

/// One organization's aggregate sponsorship history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorRecord {
    /// Canonical organization name as filed.
    pub name: String,
    /// Aggregate petition filing volume.
    #[serde(default)]
    pub petitions: u32,
    #[serde(default)]
    pub approval_rate: f32,
    #[serde(default)]
    pub avg_salary: u32,
    /// Precomputed name variants used in matching (short forms, brands).
    #[serde(default)]
    pub variants: Vec<String>,
}

/// Ordered registry; order matters because the first matching entry wins.
#[derive(Debug, Clone, Deserialize)]
pub struct SponsorRegistry {
    #[serde(default)]
    pub sponsors: Vec<SponsorRecord>,
}

impl SponsorRegistry {
    /// Load from the configured path, honoring the env override.
    /// Falls back to `default_seed()` when the file is missing or malformed.
    pub fn load(configured_path: &str) -> Self {
        let path = std::env::var(ENV_SPONSOR_DATA_PATH)
            .unwrap_or_else(|_| configured_path.to_string());
        Self::load_from_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                tracing::warn!(
                    error = %e,
                    path = %path.as_ref().display(),
                    "sponsor data unreadable; using built-in seed"
                );
                Self::default_seed()
            }),
            Err(_) => Self::default_seed(),
        }
    }

    pub fn len(&self) -> usize {
        self.sponsors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sponsors.is_empty()
    }

    /// Fuzzy-match a free-text organization name against the registry.
    /// Registry order, first hit wins; each entry is tried by canonical name
    /// and then by its variants.
    pub fn find(&self, company: &str) -> Option<&SponsorRecord> {
        let query = company.trim();
        if query.is_empty() {
            return None;
        }
        self.sponsors.iter().find(|rec| {
            std::iter::once(rec.name.as_str())
                .chain(rec.variants.iter().map(String::as_str))
                .any(|candidate| names_match(query, candidate))
        })
    }

    /// Built-in seed of consistently high-volume sponsors. Used as fallback
    /// if no data file is found.
    pub(crate) fn default_seed() -> Self {
        let mut sponsors = Vec::new();
        let rows: &[(&str, u32, f32, u32, &[&str])] = &[
            ("Amazon.com Services LLC", 9265, 0.97, 136_000, &["Amazon", "Amazon Web Services", "AWS"]),
            ("Google LLC", 7284, 0.99, 158_000, &["Google", "Alphabet"]),
            ("Microsoft Corporation", 6523, 0.98, 149_000, &["Microsoft"]),
            ("Meta Platforms Inc", 4189, 0.98, 176_000, &["Meta", "Facebook"]),
            ("Apple Inc", 3861, 0.98, 165_000, &["Apple"]),
            ("Tata Consultancy Services Limited", 5912, 0.94, 97_000, &["TCS", "Tata Consultancy"]),
            ("Infosys Limited", 5347, 0.93, 95_000, &["Infosys"]),
            ("Intel Corporation", 2790, 0.97, 128_000, &["Intel"]),
            ("IBM Corporation", 2571, 0.96, 118_000, &["IBM", "International Business Machines"]),
            ("Deloitte Consulting LLP", 2433, 0.95, 112_000, &["Deloitte"]),
            ("JPMorgan Chase & Co", 2104, 0.96, 131_000, &["JPMorgan", "JP Morgan", "Chase"]),
            ("Goldman Sachs & Co LLC", 1408, 0.96, 134_000, &["Goldman Sachs"]),
            ("Oracle America Inc", 1966, 0.97, 133_000, &["Oracle"]),
            ("Salesforce Inc", 1345, 0.98, 145_000, &["Salesforce"]),
            ("NVIDIA Corporation", 1289, 0.99, 172_000, &["NVIDIA"]),
            ("Qualcomm Technologies Inc", 1178, 0.98, 139_000, &["Qualcomm"]),
        ];
        for &(name, petitions, approval_rate, avg_salary, variants) in rows {
            sponsors.push(SponsorRecord {
                name: name.to_string(),
                petitions,
                approval_rate,
                avg_salary,
                variants: variants.iter().map(|v| v.to_string()).collect(),
            });
        }
        Self { sponsors }
    }
}

/// The enrichment a consumer sees for one posting, serialized with a
/// kebab-case `status` tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SponsorshipAssessment {
    /// The posting itself declared intent; authoritative over the registry.
    Declared { hint: SponsorshipHint },
    /// No declared hint, but the company matches a registry entry.
    RegistryMatch { sponsor: SponsorSummary },
    /// Nothing declared, nothing matched.
    Unknown,
}

/// Structured sponsor summary returned to consumers on a registry hit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SponsorSummary {
    pub name: String,
    pub petitions: u32,
    pub approval_rate: f32,
    pub avg_salary: u32,
}

impl From<&SponsorRecord> for SponsorSummary {
    fn from(rec: &SponsorRecord) -> Self {
        Self {
            name: rec.name.clone(),
            petitions: rec.petitions,
            approval_rate: rec.approval_rate,
            avg_salary: rec.avg_salary,
        }
    }
}

/// Resolve the sponsorship signal for one posting. A non-Unknown hint the
/// source declared overrides the registry entirely; otherwise the registry
/// lookup decides.
pub fn effective_sponsorship(
    job: &JobPosting,
    registry: &SponsorRegistry,
) -> SponsorshipAssessment {
    if job.sponsorship.is_declared() {
        return SponsorshipAssessment::Declared {
            hint: job.sponsorship,
        };
    }
    match registry.find(&job.company) {
        Some(rec) => SponsorshipAssessment::RegistryMatch {
            sponsor: SponsorSummary::from(rec),
        },
        None => SponsorshipAssessment::Unknown,
    }
}

/// Match rules, tried in order:
/// (a) either name contains the other, case-insensitive;
/// (b) the first whitespace token of each name is equal;
/// (c) either name with legal-entity suffixes stripped contains the other.
fn names_match(query: &str, candidate: &str) -> bool {
    let q = query.to_lowercase();
    let c = candidate.to_lowercase();
    if q.is_empty() || c.is_empty() {
        return false;
    }

    if q.contains(&c) || c.contains(&q) {
        return true;
    }

    if let (Some(qt), Some(ct)) = (q.split_whitespace().next(), c.split_whitespace().next()) {
        if qt == ct {
            return true;
        }
    }

    let qs = strip_legal_suffixes(&q);
    let cs = strip_legal_suffixes(&c);
    !qs.is_empty() && !cs.is_empty() && (qs.contains(&cs) || cs.contains(&qs))
}

/// Drop the fixed legal-entity suffix words wherever they appear, then
/// collapse whitespace. Mirrors the suffix list the dedup key uses.
fn strip_legal_suffixes(name: &str) -> String {
    static RE_SUFFIX: OnceCell<Regex> = OnceCell::new();
    let re = RE_SUFFIX.get_or_init(|| {
        Regex::new(r"(?i)[.,]?\s*\b(inc|llc|corp|ltd|co|corporation|incorporated|limited)\b\.?")
            .unwrap()
    });
    let stripped = re.replace_all(name, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}
