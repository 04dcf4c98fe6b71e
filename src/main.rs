//! Jobwire binary entrypoint.
//! Boots the Axum HTTP server, wiring config, caches, sponsor registry,
//! and the metrics exporter.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use jobwire::aggregate::cache::JobCache;
use jobwire::aggregate::dedup::DedupEngine;
use jobwire::aggregate::sources;
use jobwire::api::{create_router, AppState};
use jobwire::config::AggregatorConfig;
use jobwire::metrics::Metrics;
use jobwire::sponsors::SponsorRegistry;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,jobwire=debug"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();

    let cfg = AggregatorConfig::load();
    let registry = Arc::new(SponsorRegistry::load(&cfg.sponsors.data_path));
    tracing::info!(sponsors = registry.len(), "sponsor registry loaded");

    let metrics = Metrics::init(cfg.aggregate_ttl());

    let engine = DedupEngine::new(cfg.merge_policy());
    let state = AppState {
        aggregate: JobCache::new(
            "aggregate",
            sources::aggregate_sources(&cfg),
            cfg.aggregate_ttl(),
            engine.clone(),
        ),
        internships: JobCache::new(
            "internships",
            sources::internships_source(&cfg),
            cfg.internships_ttl(),
            engine,
        ),
        sponsors: registry,
    };

    let router = create_router(state).merge(metrics.router());

    let addr = format!("0.0.0.0:{}", cfg.port);
    tracing::info!(%addr, "jobwire listening");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
