// src/aggregate/sources/remoteok.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use metrics::{counter, histogram};
use serde::Deserialize;

use crate::aggregate::normalize_text;
use crate::aggregate::types::{JobPosting, JobSource, SponsorshipHint};

pub const DEFAULT_ENDPOINT: &str = "https://remoteok.com/api";

const SOURCE: &str = "remoteok";

/// Vendor shape: one JSON array whose first element is an API/legal notice
/// (no id, no position) followed by job entries. `id` arrives as a string in
/// current payloads and as a number in older ones.
#[derive(Debug, Deserialize)]
struct Item {
    id: Option<serde_json::Value>,
    position: Option<String>,
    company: Option<String>,
    location: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    logo: Option<String>,
    company_logo: Option<String>,
    description: Option<String>,
    salary_min: Option<u64>,
    salary_max: Option<u64>,
    url: Option<String>,
    apply_url: Option<String>,
    date: Option<String>,
    epoch: Option<i64>,
}

pub struct RemoteOkSource {
    endpoint: String,
    client: reqwest::Client,
}

impl RemoteOkSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: super::http_client(timeout),
        }
    }

    /// Map the raw JSON body into canonical postings. Entries without an id
    /// (the leading API notice included) are skipped; every other missing
    /// field gets a source-appropriate fallback.
    pub fn parse_feed(body: &str) -> Result<Vec<JobPosting>> {
        let t0 = std::time::Instant::now();
        let items: Vec<Item> = serde_json::from_str(body).context("remoteok payload shape")?;

        let mut out = Vec::with_capacity(items.len());
        for it in items {
            let Some(vendor_id) = it.id.as_ref().and_then(id_to_string) else {
                continue;
            };
            let posted_at = parse_posted_at(it.date.as_deref(), it.epoch);
            out.push(JobPosting {
                id: format!("{SOURCE}-{vendor_id}"),
                title: it
                    .position
                    .filter(|p| !p.trim().is_empty())
                    .unwrap_or_else(|| "Remote Position".to_string()),
                company: it
                    .company
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                location: it
                    .location
                    .filter(|l| !l.trim().is_empty())
                    .unwrap_or_else(|| "Remote".to_string()),
                salary: format_salary(it.salary_min, it.salary_max),
                job_type: "Remote".to_string(),
                description: normalize_text(it.description.as_deref().unwrap_or_default()),
                tags: it.tags,
                logo_url: it.company_logo.or(it.logo).filter(|l| !l.is_empty()),
                apply_url: it.apply_url.or(it.url).unwrap_or_default(),
                posted_at,
                updated_at: posted_at,
                source: SOURCE.to_string(),
                sponsorship: SponsorshipHint::Unknown,
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
impl JobSource for RemoteOkSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("remoteok request")?
            .error_for_status()
            .context("remoteok status")?
            .text()
            .await
            .context("remoteok body")?;
        Self::parse_feed(&body)
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

fn id_to_string(v: &serde_json::Value) -> Option<String> {
    match v {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_posted_at(date: Option<&str>, epoch: Option<i64>) -> DateTime<Utc> {
    if let Some(d) = date {
        if let Ok(dt) = DateTime::parse_from_rfc3339(d) {
            return dt.with_timezone(&Utc);
        }
    }
    if let Some(e) = epoch {
        if let Some(dt) = Utc.timestamp_opt(e, 0).single() {
            return dt;
        }
    }
    Utc::now()
}

fn format_salary(min: Option<u64>, max: Option<u64>) -> Option<String> {
    match (min, max) {
        (Some(lo), Some(hi)) if lo > 0 && hi > 0 => Some(format!("${lo} - ${hi}")),
        _ => None,
    }
}
