// src/aggregate/sources/internships.rs
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::aggregate::table::{parse_table, TableRow};
use crate::aggregate::types::{JobPosting, JobSource};

const SOURCE: &str = "internships";

/// Adapter over a README-style document whose payload is a pipe-delimited
/// table of internship listings. Rows carry no vendor id, so each posting
/// gets a short stable hash of company, title and apply URL.
pub struct InternshipsSource {
    endpoint: String,
    client: reqwest::Client,
}

impl InternshipsSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: super::http_client(timeout),
        }
    }

    /// Parse the whole document into canonical postings. Row-level
    /// malformation is handled inside the table parser; this only maps the
    /// surviving rows.
    pub fn parse_document(doc: &str) -> Vec<JobPosting> {
        let t0 = std::time::Instant::now();
        let now = Utc::now();
        let out: Vec<JobPosting> = parse_table(doc)
            .into_iter()
            .map(|row| row_to_posting(row, now))
            .collect();

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_parse_ms").record(ms);
        counter!("aggregate_source_jobs_total", "source" => SOURCE).increment(out.len() as u64);
        out
    }
}

#[async_trait]
impl JobSource for InternshipsSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        let body = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .context("internships document request")?
            .error_for_status()
            .context("internships document status")?
            .text()
            .await
            .context("internships document body")?;
        Ok(Self::parse_document(&body))
    }

    fn name(&self) -> &'static str {
        SOURCE
    }
}

fn row_to_posting(row: TableRow, now: DateTime<Utc>) -> JobPosting {
    // `now - age` panics when the result leaves the calendar range, and age
    // cells are third-party content. Degrade to "posted now" instead.
    let posted_at = row
        .age
        .as_deref()
        .and_then(parse_relative_age)
        .and_then(|age| now.checked_sub_signed(age))
        .unwrap_or(now);
    let description = format!("{} at {} ({})", row.title, row.company, row.location);
    let id = format!(
        "{SOURCE}-{}",
        super::short_hash(&format!("{}|{}|{}", row.company, row.title, row.apply_url))
    );

    JobPosting {
        id,
        title: row.title,
        company: row.company,
        location: row.location,
        salary: row.salary,
        job_type: row.job_type.to_string(),
        description,
        tags: Vec::new(),
        logo_url: None,
        apply_url: row.apply_url,
        posted_at,
        updated_at: posted_at,
        source: SOURCE.to_string(),
        sponsorship: row.sponsorship,
        active: true,
    }
}

/// Relative-age cells as the table writes them: "14h", "2d", "3w", "1mo",
/// optionally suffixed with "ago". Unparseable and out-of-range cells both
/// mean "posted now".
fn parse_relative_age(cell: &str) -> Option<chrono::Duration> {
    static RE_AGE: OnceCell<Regex> = OnceCell::new();
    let re = RE_AGE.get_or_init(|| {
        Regex::new(r"(?i)^\s*(\d+)\s*(mo|h|d|w)\s*(?:ago)?\s*$").unwrap()
    });
    let caps = re.captures(cell)?;
    let n: i64 = caps[1].parse().ok()?;
    // The checked constructors reject values past chrono's bounds, which a
    // digits-only cell can reach.
    match caps[2].to_lowercase().as_str() {
        "h" => chrono::Duration::try_hours(n),
        "d" => chrono::Duration::try_days(n),
        "w" => chrono::Duration::try_weeks(n),
        "mo" => 30_i64.checked_mul(n).and_then(chrono::Duration::try_days),
        _ => None,
    }
}
