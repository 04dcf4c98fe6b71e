// src/aggregate/mod.rs
pub mod cache;
pub mod dedup;
pub mod sources;
pub mod table;
pub mod types;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;

use crate::aggregate::dedup::DedupEngine;
use crate::aggregate::types::{JobPosting, JobSource};

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "aggregate_jobs_fetched_total",
            "Raw postings fetched across all sources, pre-dedup."
        );
        describe_counter!(
            "aggregate_jobs_kept_total",
            "Postings kept after deduplication."
        );
        describe_counter!(
            "aggregate_dedup_removed_total",
            "Postings folded into an existing representative."
        );
        describe_counter!(
            "aggregate_source_errors_total",
            "Source fetch/parse errors absorbed by the cycle."
        );
        describe_counter!(
            "aggregate_source_jobs_total",
            "Postings parsed per source, pre-dedup."
        );
        describe_histogram!(
            "aggregate_fetch_ms",
            "Per-source fetch+parse time in milliseconds."
        );
        describe_histogram!("aggregate_parse_ms", "Payload parse time in milliseconds.");
        describe_gauge!(
            "aggregate_last_cycle_ts",
            "Unix ts when an aggregation cycle last completed."
        );
    });
}

/// Normalize free text coming from vendor payloads: decode HTML entities,
/// strip tags, normalize typographic quotes, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    out = out.split_whitespace().collect::<Vec<_>>().join(" ");

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Everything one refresh cycle produces, before the cache snapshot swap.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    /// Deduplicated postings, newest first.
    pub jobs: Vec<JobPosting>,
    /// Records contributed per source; a failed source reports 0.
    pub per_source_counts: BTreeMap<String, usize>,
    /// Concatenated record count before deduplication.
    pub raw_count: usize,
}

/// Run one aggregation cycle: fan out to every source concurrently, absorb
/// per-source failures into empty contributions, concatenate, deduplicate,
/// sort newest-first. Source errors degrade the result, they never fail it.
pub async fn run_cycle(sources: &[Arc<dyn JobSource>], engine: &DedupEngine) -> CycleOutcome {
    ensure_metrics_described();

    let fetches = sources.iter().map(|source| async move {
        let started = Instant::now();
        let result = source.fetch().await;
        let ms = started.elapsed().as_secs_f64() * 1_000.0;
        histogram!("aggregate_fetch_ms", "source" => source.name()).record(ms);
        (source.name(), result)
    });
    let results = join_all(fetches).await;

    let mut raw: Vec<JobPosting> = Vec::new();
    let mut per_source_counts = BTreeMap::new();
    for (name, result) in results {
        match result {
            Ok(mut jobs) => {
                per_source_counts.insert(name.to_string(), jobs.len());
                raw.append(&mut jobs);
            }
            Err(e) => {
                tracing::warn!(error = ?e, source = name, "source fetch failed");
                counter!("aggregate_source_errors_total").increment(1);
                per_source_counts.insert(name.to_string(), 0);
            }
        }
    }

    let raw_count = raw.len();
    let mut jobs = engine.dedup(raw);
    jobs.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

    counter!("aggregate_jobs_fetched_total").increment(raw_count as u64);
    counter!("aggregate_jobs_kept_total").increment(jobs.len() as u64);
    counter!("aggregate_dedup_removed_total").increment((raw_count - jobs.len()) as u64);
    gauge!("aggregate_last_cycle_ts").set(chrono::Utc::now().timestamp() as f64);

    CycleOutcome {
        jobs,
        per_source_counts,
        raw_count,
    }
}
