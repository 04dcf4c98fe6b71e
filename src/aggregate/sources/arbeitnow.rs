// src/aggregate/sources/arbeitnow.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::aggregate::normalize_text;
use crate::aggregate::types::{JobPosting, JobSource, SponsorshipHint};

pub const DEFAULT_ENDPOINT: &str = "https://www.arbeitnow.com/api/job-board-api";

const SOURCE: &str = "arbeitnow";

/// Vendor shape: `{ "data": [ ... ], "links": { ... }, "meta": { ... } }`.
/// Only `data` matters; pagination is ignored (first page only, as upstream
/// orders newest-first).
#[derive(Debug, Deserialize)]
struct Feed {
    #[serde(default)]
    data: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    slug: Option<String>,
    company_name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    #[serde(default)]
    remote: bool,
    url: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    job_types: Vec<String>,
    location: Option<String>,
    created_at: Option<i64>,
    #[serde(default)]
    visa_sponsorship: bool,
}

pub struct ArbeitnowSource {
    endpoint: String,
    client: reqwest::Client,
}

impl ArbeitnowSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: super::http_client(timeout),
        }
    }

    /// Map the raw JSON body into canonical postings. Entries without a slug
    /// are skipped (no stable id); a declared `visa_sponsorship: true` maps
    /// to an `Offers` hint, which later overrides any registry lookup.
    pub fn parse_feed(body: &str) -> Result<Vec<JobPosting>> {
        let t0 = std::time::Instant::now();
        let feed: Feed = serde_json::from_str(body).context("arbeitnow payload shape")?;

        let mut out = Vec::with_capacity(feed.data.len());
        for it in feed.data {
            let Some(slug) = it.slug.filter(|s| !s.is_empty()) else {
                continue;
            };
            let posted_at = it
                .created_at
                .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
                .unwrap_or_else(Utc::now);
            out.push(JobPosting {
                id: format!("{SOURCE}-{slug}"),
                title: it
                    .title
                    .filter(|t| !t.trim().is_empty())
                    .unwrap_or_else(|| "Software Position".to_string()),
                company: it
                    .company_name
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                location: it
                    .location
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| if it.remote { "Remote".to_string() } else { String::new() }),
                salary: None,
                job_type: canonical_job_type(&it.job_types, it.remote),
                description: normalize_text(it.description.as_deref().unwrap_or_default()),
                tags: it.tags,
                logo_url: None,
                apply_url: it.url.unwrap_or_default(),
                posted_at,
                updated_at: posted_at,
                source: SOURCE.to_string(),
                sponsorship: if it.visa_sponsorship {
                    SponsorshipHint::Offers
                } else {
                    SponsorshipHint::Unknown
                },
                active: true,
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_parse_ms").record(ms);
        counter!("aggregate_source_jobs_total", "source" => SOURCE).increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl JobSource for ArbeitnowSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("arbeitnow request")?
            .error_for_status()
            .context("arbeitnow status")?
            .text()
            .await
            .context("arbeitnow body")?;
        Self::parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

/// Map vendor job-type slugs onto the canonical vocabulary; first recognized
/// slug wins, remote-only listings without a slug fall back to "Remote".
fn canonical_job_type(job_types: &[String], remote: bool) -> String {
    for t in job_types {
        let slug = t.to_lowercase().replace([' ', '-'], "_");
        let mapped = match slug.as_str() {
            "internship" | "intern" | "werkstudent" => "Internship",
            "full_time" | "fulltime" | "permanent" => "Full-time",
            "part_time" | "parttime" | "mini_job" => "Part-time",
            "contract" | "freelance" | "temporary" => "Contract",
            _ => continue,
        };
        return mapped.to_string();
    }
    if remote {
        "Remote".to_string()
    } else {
        "Full-time".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn job_type_slugs_map_to_canonical_vocabulary() {
        assert_eq!(canonical_job_type(&types(&["full_time"]), false), "Full-time");
        assert_eq!(canonical_job_type(&types(&["Internship"]), false), "Internship");
        assert_eq!(canonical_job_type(&types(&["mini-job"]), false), "Part-time");
        assert_eq!(canonical_job_type(&types(&["freelance"]), true), "Contract");
    }

    #[test]
    fn unrecognized_slugs_fall_back_by_remote_flag() {
        assert_eq!(canonical_job_type(&types(&["açaí"]), true), "Remote");
        assert_eq!(canonical_job_type(&[], false), "Full-time");
        // First recognized slug wins over later ones.
        assert_eq!(
            canonical_job_type(&types(&["exotic", "part_time", "full_time"]), false),
            "Part-time"
        );
    }
}
