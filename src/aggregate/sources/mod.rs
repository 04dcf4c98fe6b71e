// src/aggregate/sources/mod.rs
pub mod arbeitnow;
pub mod internships;
pub mod remoteok;

use std::sync::Arc;
use std::time::Duration;

use crate::aggregate::types::JobSource;
use crate::config::AggregatorConfig;

pub(crate) const USER_AGENT: &str = "jobwire/0.1";

/// Shared HTTP client shape for all adapters: bounded total-request timeout
/// so one slow source cannot stall a cycle beyond its own bound.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .expect("reqwest client")
}

/// Stable 12-hex-char id fragment for rows that carry no vendor id.
pub(crate) fn short_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// The full adapter set behind the multi-source aggregate cache.
pub fn aggregate_sources(cfg: &AggregatorConfig) -> Vec<Arc<dyn JobSource>> {
    let timeout = cfg.fetch_timeout();
    vec![
        Arc::new(remoteok::RemoteOkSource::new(
            &cfg.sources.remoteok_url,
            timeout,
        )),
        Arc::new(arbeitnow::ArbeitnowSource::new(
            &cfg.sources.arbeitnow_url,
            timeout,
        )),
        Arc::new(internships::InternshipsSource::new(
            &cfg.sources.internships_url,
            timeout,
        )),
    ]
}

/// The single adapter behind the internships-only cache.
pub fn internships_source(cfg: &AggregatorConfig) -> Vec<Arc<dyn JobSource>> {
    vec![Arc::new(internships::InternshipsSource::new(
        &cfg.sources.internships_url,
        cfg.fetch_timeout(),
    ))]
}
