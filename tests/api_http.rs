// tests/api_http.rs
//
// HTTP-level tests for the public API Router without opening sockets.
// We exercise the router directly via tower::ServiceExt::oneshot, with the
// caches backed by in-memory mock sources.
//
// Covered:
// - GET /health
// - GET /jobs  (flattened posting + sponsorship assessment)
// - GET /internships
// - GET /sponsors/check  (match + missing-parameter rejection)
// - GET /diagnostics
// - POST /admin/refresh
// - POST /admin/clear

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    Router,
};
use chrono::{TimeZone, Utc};
use http::{Request, StatusCode};
use serde_json::Value as Json;
use tower::ServiceExt as _; // for `oneshot`

use jobwire::aggregate::cache::JobCache;
use jobwire::aggregate::dedup::DedupEngine;
use jobwire::aggregate::types::{JobPosting, JobSource, SponsorshipHint};
use jobwire::api::{create_router, AppState};
use jobwire::sponsors::SponsorRegistry;

const BODY_LIMIT: usize = 1024 * 1024; // 1MB, safe for tests

fn posting(id: &str, company: &str, title: &str, hint: SponsorshipHint, ts: i64) -> JobPosting {
    let at = Utc.timestamp_opt(ts, 0).single().expect("valid ts");
    JobPosting {
        id: id.to_string(),
        title: title.to_string(),
        company: company.to_string(),
        location: "Remote".to_string(),
        salary: None,
        job_type: "Full-time".to_string(),
        description: String::new(),
        tags: vec![],
        logo_url: None,
        apply_url: "https://example.test/apply".to_string(),
        posted_at: at,
        updated_at: at,
        source: "mock".to_string(),
        sponsorship: hint,
        active: true,
    }
}

struct StaticSource {
    name: &'static str,
    jobs: Vec<JobPosting>,
}

#[async_trait]
impl JobSource for StaticSource {
    async fn fetch(&self) -> Result<Vec<JobPosting>> {
        Ok(self.jobs.clone())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Build the same Router the binary uses, backed by mock sources: three
/// aggregate postings exercising every assessment branch plus one internship.
fn test_router() -> Router {
    let aggregate_jobs = vec![
        posting("g-1", "Google LLC", "Backend Engineer", SponsorshipHint::Unknown, 3_000),
        posting("t-1", "Tiny Startup", "Data Engineer", SponsorshipHint::Offers, 2_000),
        posting("u-1", "Unheard Of GmbH", "QA Analyst", SponsorshipHint::Unknown, 1_000),
    ];
    let mut internship = posting("i-1", "Vercel", "Platform Intern", SponsorshipHint::Unknown, 500);
    internship.job_type = "Internship".to_string();

    let state = AppState {
        aggregate: JobCache::new(
            "aggregate",
            vec![Arc::new(StaticSource {
                name: "mock-aggregate",
                jobs: aggregate_jobs,
            })],
            Duration::from_secs(3600),
            DedupEngine::default(),
        ),
        internships: JobCache::new(
            "internships",
            vec![Arc::new(StaticSource {
                name: "mock-internships",
                jobs: vec![internship],
            })],
            Duration::from_secs(3600),
            DedupEngine::default(),
        ),
        sponsors: Arc::new(SponsorRegistry::load_from_file("config/sponsors.json")),
    };
    create_router(state)
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("build GET request");
    let resp = app.clone().oneshot(req).await.expect("oneshot");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).unwrap_or(Json::Null);
    (status, v)
}

#[tokio::test]
async fn api_health_returns_200_and_ok_body() {
    let app = test_router();

    let req = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .expect("build GET /health");

    let resp = app.oneshot(req).await.expect("oneshot /health");
    assert_eq!(resp.status(), StatusCode::OK, "health should be 200");

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let body = String::from_utf8(bytes).expect("utf8");
    assert_eq!(body.trim(), "ok", "health body should be 'ok'");
}

#[tokio::test]
async fn api_jobs_returns_enriched_postings_newest_first() {
    let app = test_router();
    let (status, v) = get_json(&app, "/jobs").await;
    assert_eq!(status, StatusCode::OK, "GET /jobs should be 200");

    let arr = v.as_array().expect("jobs response must be an array");
    assert_eq!(arr.len(), 3, "all mock postings survive dedup");

    // Posting fields stay flattened at the top level.
    assert_eq!(arr[0]["id"], "g-1", "newest posting first");
    assert_eq!(arr[0]["company"], "Google LLC");
    assert_eq!(arr[0]["apply_url"], "https://example.test/apply");

    // One assessment branch per posting.
    let a0 = &arr[0]["sponsorship_assessment"];
    assert_eq!(a0["status"], "registry-match");
    assert_eq!(a0["sponsor"]["name"], "Google LLC");
    assert!(a0["sponsor"]["petitions"].as_u64().unwrap_or(0) > 0);

    let a1 = &arr[1]["sponsorship_assessment"];
    assert_eq!(a1["status"], "declared", "declared hint beats the registry");
    assert_eq!(a1["hint"], "offers");

    assert_eq!(arr[2]["sponsorship_assessment"]["status"], "unknown");
}

#[tokio::test]
async fn api_internships_lists_the_single_source() {
    let app = test_router();
    let (status, v) = get_json(&app, "/internships").await;
    assert_eq!(status, StatusCode::OK, "GET /internships should be 200");

    let arr = v.as_array().expect("internships response must be an array");
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0]["id"], "i-1");
    assert_eq!(arr[0]["job_type"], "Internship");
}

#[tokio::test]
async fn api_sponsors_check_matches_and_rejects_missing_param() {
    let app = test_router();

    let (status, v) = get_json(&app, "/sponsors/check?company=Amazon").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["company"], "Amazon");
    assert_eq!(v["matched"]["name"], "Amazon.com Services LLC");

    let (status, v) = get_json(&app, "/sponsors/check?company=Nobody+Knows+This+One").await;
    assert_eq!(status, StatusCode::OK);
    assert!(v["matched"].is_null(), "unmatched companies report null");

    let req = Request::builder()
        .method("GET")
        .uri("/sponsors/check")
        .body(Body::empty())
        .expect("build GET /sponsors/check");
    let resp = app.oneshot(req).await.expect("oneshot /sponsors/check");
    assert_eq!(
        resp.status(),
        StatusCode::BAD_REQUEST,
        "missing company parameter must be rejected"
    );
}

#[tokio::test]
async fn api_diagnostics_reflects_cache_state() {
    let app = test_router();

    // Before any fetch both caches are empty.
    let (status, v) = get_json(&app, "/diagnostics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["aggregate"]["total_jobs"], 0);
    assert!(v["aggregate"]["last_fetch"].is_null());
    assert!(v["sponsor_registry_entries"].as_u64().unwrap_or(0) >= 20);

    // Warm the aggregate cache only.
    let (status, _) = get_json(&app, "/jobs").await;
    assert_eq!(status, StatusCode::OK);

    let (_, v) = get_json(&app, "/diagnostics").await;
    assert_eq!(v["aggregate"]["total_jobs"], 3);
    assert_eq!(v["aggregate"]["per_source_counts"]["mock-aggregate"], 3);
    assert_eq!(v["aggregate"]["cache_age_minutes"], 0);
    assert!(
        v["internships"]["last_fetch"].is_null(),
        "internships cache stays cold until requested"
    );
}

#[tokio::test]
async fn api_admin_refresh_reports_counts() {
    let app = test_router();

    let req = Request::builder()
        .method("POST")
        .uri("/admin/refresh")
        .body(Body::empty())
        .expect("build POST /admin/refresh");
    let resp = app.oneshot(req).await.expect("oneshot /admin/refresh");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read json")
        .to_vec();
    let v: Json = serde_json::from_slice(&bytes).expect("parse refresh json");
    assert_eq!(v["aggregate_jobs"], 3);
    assert_eq!(v["internships_jobs"], 1);
}

#[tokio::test]
async fn api_admin_clear_empties_both_caches() {
    let app = test_router();

    let (status, _) = get_json(&app, "/jobs").await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .method("POST")
        .uri("/admin/clear")
        .body(Body::empty())
        .expect("build POST /admin/clear");
    let resp = app.clone().oneshot(req).await.expect("oneshot /admin/clear");
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    assert_eq!(String::from_utf8(bytes).expect("utf8"), "cleared");

    let (_, v) = get_json(&app, "/diagnostics").await;
    assert_eq!(v["aggregate"]["total_jobs"], 0);
    assert!(v["aggregate"]["last_fetch"].is_null());
}

#[tokio::test]
async fn api_refresh_param_forces_a_new_cycle() {
    let app = test_router();

    let (_, first) = get_json(&app, "/jobs").await;
    let (status, second) = get_json(&app, "/jobs?refresh=1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        first.as_array().map(Vec::len),
        second.as_array().map(Vec::len),
        "forced refresh returns the same mock postings"
    );
}
