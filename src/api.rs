use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::aggregate::cache::{Diagnostics, JobCache};
use crate::aggregate::types::JobPosting;
use crate::sponsors::{effective_sponsorship, SponsorRegistry, SponsorSummary, SponsorshipAssessment};

/// Shared handles behind every route. Cloning is cheap; the caches share
/// state across clones and the registry is immutable.
#[derive(Clone)]
pub struct AppState {
    pub aggregate: JobCache,
    pub internships: JobCache,
    pub sponsors: Arc<SponsorRegistry>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/jobs", get(list_jobs))
        .route("/internships", get(list_internships))
        .route("/diagnostics", get(diagnostics))
        .route("/sponsors/check", get(sponsors_check))
        .route("/admin/refresh", post(admin_refresh))
        .route("/admin/clear", post(admin_clear))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// A posting plus the sponsorship assessment resolved at read time.
#[derive(serde::Serialize)]
struct EnrichedJob {
    #[serde(flatten)]
    job: JobPosting,
    sponsorship_assessment: SponsorshipAssessment,
}

async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EnrichedJob>>, (StatusCode, String)> {
    let jobs = state
        .aggregate
        .fetch_all(wants_refresh(&q))
        .await
        .map_err(internal_error)?;
    Ok(Json(enrich(jobs, &state.sponsors)))
}

async fn list_internships(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<Vec<EnrichedJob>>, (StatusCode, String)> {
    let jobs = state
        .internships
        .fetch_all(wants_refresh(&q))
        .await
        .map_err(internal_error)?;
    Ok(Json(enrich(jobs, &state.sponsors)))
}

#[derive(serde::Serialize)]
struct DiagnosticsOut {
    aggregate: Diagnostics,
    internships: Diagnostics,
    sponsor_registry_entries: usize,
}

async fn diagnostics(State(state): State<AppState>) -> Json<DiagnosticsOut> {
    Json(DiagnosticsOut {
        aggregate: state.aggregate.diagnostics(),
        internships: state.internships.diagnostics(),
        sponsor_registry_entries: state.sponsors.len(),
    })
}

#[derive(serde::Serialize)]
struct SponsorCheckOut {
    company: String,
    matched: Option<SponsorSummary>,
}

async fn sponsors_check(
    State(state): State<AppState>,
    Query(q): Query<HashMap<String, String>>,
) -> Result<Json<SponsorCheckOut>, (StatusCode, String)> {
    let company = q.get("company").cloned().unwrap_or_default();
    if company.trim().is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "missing 'company' query parameter".to_string(),
        ));
    }
    let matched = state.sponsors.find(&company).map(SponsorSummary::from);
    Ok(Json(SponsorCheckOut { company, matched }))
}

#[derive(serde::Serialize)]
struct RefreshOut {
    aggregate_jobs: usize,
    internships_jobs: usize,
}

async fn admin_refresh(
    State(state): State<AppState>,
) -> Result<Json<RefreshOut>, (StatusCode, String)> {
    let (aggregate, internships) = tokio::join!(
        state.aggregate.force_refresh(),
        state.internships.force_refresh()
    );
    Ok(Json(RefreshOut {
        aggregate_jobs: aggregate.map_err(internal_error)?.len(),
        internships_jobs: internships.map_err(internal_error)?.len(),
    }))
}

async fn admin_clear(State(state): State<AppState>) -> &'static str {
    state.aggregate.clear();
    state.internships.clear();
    "cleared"
}

fn enrich(jobs: Vec<JobPosting>, registry: &SponsorRegistry) -> Vec<EnrichedJob> {
    jobs.into_iter()
        .map(|job| {
            let sponsorship_assessment = effective_sponsorship(&job, registry);
            EnrichedJob {
                job,
                sponsorship_assessment,
            }
        })
        .collect()
}

fn wants_refresh(q: &HashMap<String, String>) -> bool {
    matches!(
        q.get("refresh").map(String::as_str),
        Some("1") | Some("true") | Some("yes")
    )
}

fn internal_error(err: anyhow::Error) -> (StatusCode, String) {
    tracing::error!(error = ?err, "request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}
