// tests/sources_remoteok.rs
//
// Fixture-level tests for the RemoteOK feed adapter. The fixture mirrors the
// live payload: a leading API notice (no id), a fully populated entry with a
// string id, and a sparse legacy entry with a numeric id.

use jobwire::aggregate::sources::remoteok::RemoteOkSource;
use jobwire::aggregate::types::SponsorshipHint;

const FEED: &str = include_str!("fixtures/remoteok.json");

#[test]
fn fixture_parses_and_skips_idless_entries() {
    let jobs = RemoteOkSource::parse_feed(FEED).expect("fixture should parse");
    // The API notice and the empty-id entry both drop out.
    assert_eq!(jobs.len(), 2);
    assert!(jobs.iter().all(|j| j.id.starts_with("remoteok-")));
    assert!(jobs.iter().all(|j| j.source == "remoteok"));
}

#[test]
fn full_entry_maps_every_field() {
    let jobs = RemoteOkSource::parse_feed(FEED).expect("fixture should parse");
    let j = jobs
        .iter()
        .find(|j| j.id == "remoteok-1090541")
        .expect("string-id entry");

    assert_eq!(j.title, "Senior Rust Engineer");
    assert_eq!(j.company, "Oxide Computer");
    assert_eq!(j.location, "Worldwide");
    assert_eq!(j.salary.as_deref(), Some("$150000 - $210000"));
    assert_eq!(j.job_type, "Remote");
    assert_eq!(j.tags, vec!["rust", "systems", "backend"]);
    assert_eq!(
        j.description, "Build & operate control-plane services in Rust.",
        "description must be entity-decoded and tag-stripped"
    );
    assert_eq!(
        j.logo_url.as_deref(),
        Some("https://remoteok.com/assets/logos/oxide.png")
    );
    assert_eq!(j.apply_url, "https://oxide.example/careers/apply/1090541");
    assert_eq!(j.posted_at.to_rfc3339(), "2025-08-14T09:30:00+00:00");
    assert_eq!(j.sponsorship, SponsorshipHint::Unknown);
}

#[test]
fn sparse_numeric_id_entry_gets_fallbacks() {
    let jobs = RemoteOkSource::parse_feed(FEED).expect("fixture should parse");
    let j = jobs
        .iter()
        .find(|j| j.id == "remoteok-1090612")
        .expect("numeric-id entry");

    assert_eq!(j.title, "Remote Position");
    assert_eq!(j.location, "Remote");
    assert_eq!(j.salary, None, "a one-sided salary range must not render");
    assert_eq!(
        j.logo_url.as_deref(),
        Some("https://remoteok.com/assets/logos/globex.png")
    );
    assert_eq!(
        j.apply_url, "https://remoteok.com/remote-jobs/1090612",
        "apply_url falls back to the listing url"
    );
    assert_eq!(j.posted_at.timestamp(), 1_755_250_200);
}

#[test]
fn malformed_payload_is_an_error() {
    assert!(RemoteOkSource::parse_feed(r#"{"not": "an array"}"#).is_err());
    assert!(RemoteOkSource::parse_feed("nonsense").is_err());
}
