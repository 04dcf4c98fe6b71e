//! # Aggregation cache coordinator
//!
//! Owns the only mutable shared state in the pipeline: the current snapshot
//! of deduplicated postings plus the marker for an in-flight refresh. Callers
//! that hit a fresh snapshot get it without I/O; callers that hit a stale or
//! empty cache share one refresh (single-flight) instead of each fanning out
//! to every source. The snapshot is swapped atomically under one mutex, and
//! the mutex is never held across an await.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;

use crate::aggregate::dedup::DedupEngine;
use crate::aggregate::types::{JobPosting, JobSource};
use crate::aggregate::{run_cycle, CycleOutcome};

/// TTL for the multi-source aggregate cache.
pub const AGGREGATE_TTL: Duration = Duration::from_secs(4 * 60 * 60);
/// TTL for the single-source internships cache.
pub const INTERNSHIPS_TTL: Duration = Duration::from_secs(30 * 60);

/// A refresh shared between all callers that arrive while it is in flight.
/// The error side is the stringified join error of the refresh task; adapters
/// absorb their own failures, so this only fires on an orchestration fault.
type RefreshFuture = Shared<BoxFuture<'static, Result<Vec<JobPosting>, String>>>;

/// The result of the last completed cycle. Replaced as a whole; a degraded
/// cycle (sources down) still swaps in a full, consistent snapshot.
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    pub jobs: Vec<JobPosting>,
    pub fetched_at: DateTime<Utc>,
    pub per_source_counts: BTreeMap<String, usize>,
    pub raw_count: usize,
    pub unique_count: usize,
}

/// Read-only view of the coordinator state. No I/O to produce.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostics {
    pub total_jobs: usize,
    pub last_fetch: Option<DateTime<Utc>>,
    pub per_source_counts: BTreeMap<String, usize>,
    pub cache_age_minutes: Option<i64>,
    pub raw_count: usize,
    pub unique_count: usize,
    pub refreshing: bool,
}

#[derive(Default)]
struct State {
    snapshot: Option<CacheSnapshot>,
    pending: Option<RefreshFuture>,
    /// Bumped by `clear()` so an abandoned refresh cannot clobber the
    /// pending slot of a refresh started after the clear.
    epoch: u64,
}

struct Inner {
    name: &'static str,
    sources: Vec<Arc<dyn JobSource>>,
    engine: DedupEngine,
    ttl: Duration,
    state: Mutex<State>,
}

/// Coordinator over one set of sources. Cheap to clone; clones share state.
/// Instantiate one per cache (aggregate, internships), each with its own TTL.
#[derive(Clone)]
pub struct JobCache {
    inner: Arc<Inner>,
}

impl JobCache {
    pub fn new(
        name: &'static str,
        sources: Vec<Arc<dyn JobSource>>,
        ttl: Duration,
        engine: DedupEngine,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                sources,
                engine,
                ttl,
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    /// Return the deduplicated posting list, refreshing if the cache is
    /// empty, stale, or `force` is set. Concurrent callers during a refresh
    /// window share the in-flight refresh instead of starting another one.
    pub async fn fetch_all(&self, force: bool) -> Result<Vec<JobPosting>> {
        let refresh = {
            let mut state = self.inner.state.lock().expect("job cache mutex poisoned");
            if !force {
                if let Some(snapshot) = &state.snapshot {
                    if age_of(snapshot.fetched_at) < self.inner.ttl {
                        return Ok(snapshot.jobs.clone());
                    }
                }
            }
            match &state.pending {
                Some(inflight) => inflight.clone(),
                None => {
                    let started = self.start_refresh(state.epoch);
                    state.pending = Some(started.clone());
                    started
                }
            }
        };

        refresh
            .await
            .map_err(|e| anyhow!("{} cache refresh task failed: {e}", self.inner.name))
    }

    /// Bypass the TTL check; still shares an in-flight refresh if one exists.
    pub async fn force_refresh(&self) -> Result<Vec<JobPosting>> {
        self.fetch_all(true).await
    }

    /// Reset to empty and discard the pending marker. Callers already
    /// awaiting the abandoned refresh still receive its eventual result;
    /// the next `fetch_all` starts fresh.
    pub fn clear(&self) {
        let mut state = self.inner.state.lock().expect("job cache mutex poisoned");
        state.snapshot = None;
        state.pending = None;
        state.epoch = state.epoch.wrapping_add(1);
        tracing::debug!(cache = self.inner.name, "cache cleared");
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let state = self.inner.state.lock().expect("job cache mutex poisoned");
        let refreshing = state.pending.is_some();
        match &state.snapshot {
            Some(snapshot) => Diagnostics {
                total_jobs: snapshot.jobs.len(),
                last_fetch: Some(snapshot.fetched_at),
                per_source_counts: snapshot.per_source_counts.clone(),
                cache_age_minutes: Some(
                    Utc::now()
                        .signed_duration_since(snapshot.fetched_at)
                        .num_minutes(),
                ),
                raw_count: snapshot.raw_count,
                unique_count: snapshot.unique_count,
                refreshing,
            },
            None => Diagnostics {
                total_jobs: 0,
                last_fetch: None,
                per_source_counts: BTreeMap::new(),
                cache_age_minutes: None,
                raw_count: 0,
                unique_count: 0,
                refreshing,
            },
        }
    }

    /// Spawn the refresh so it runs to completion even if every caller goes
    /// away, and wrap it in a `Shared` so late arrivals can join it.
    fn start_refresh(&self, epoch: u64) -> RefreshFuture {
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            let CycleOutcome {
                jobs,
                per_source_counts,
                raw_count,
            } = run_cycle(&inner.sources, &inner.engine).await;

            let snapshot = CacheSnapshot {
                fetched_at: Utc::now(),
                per_source_counts,
                raw_count,
                unique_count: jobs.len(),
                jobs,
            };
            tracing::info!(
                cache = inner.name,
                raw = snapshot.raw_count,
                unique = snapshot.unique_count,
                "refresh cycle complete"
            );

            let jobs = snapshot.jobs.clone();
            let mut state = inner.state.lock().expect("job cache mutex poisoned");
            state.snapshot = Some(snapshot);
            if state.epoch == epoch {
                state.pending = None;
            }
            jobs
        });

        async move { handle.await.map_err(|e| e.to_string()) }
            .boxed()
            .shared()
    }
}

fn age_of(fetched_at: DateTime<Utc>) -> Duration {
    Utc::now()
        .signed_duration_since(fetched_at)
        .to_std()
        .unwrap_or(Duration::ZERO)
}
