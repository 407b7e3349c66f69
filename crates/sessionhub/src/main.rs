//! sessionhub - session analytics & smart-recap backend.
//!
//! Wires the Postgres metadata store, HTTP object store, and Anthropic LLM
//! client adapters into an `AnalyticsEndpoint` and serves it over HTTP.

use anyhow::{Context, Result};
use clap::Parser;
use sessionhub_core::{
    AnalyticsEndpoint, AppConfig, CardCache, EventBus, HttpLlmClient, HttpObjectStore, PgCardCache,
    PgMetadataStore, RecapCoordinator,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_filter.clone()))
        .init();

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("failed to connect to the metadata store")?;

    let metadata = Arc::new(PgMetadataStore::new(pool.clone()));
    let objects = Arc::new(HttpObjectStore::new(
        reqwest::Client::new(),
        config.object_store_url.clone(),
    ));
    let cache: Arc<dyn CardCache> = Arc::new(PgCardCache::new(pool));

    let llm = Arc::new(HttpLlmClient::new(
        reqwest::Client::new(),
        config.smart_recap_base_url.clone(),
        config.smart_recap_api_key.clone().unwrap_or_default(),
    ));
    let recap = Arc::new(RecapCoordinator::new(
        Arc::clone(&metadata),
        Arc::clone(&objects),
        llm,
        config.recap_config(),
        EventBus::default_capacity(),
    ));

    let endpoint = Arc::new(AnalyticsEndpoint::new(metadata, objects, cache, recap));

    let addr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address: {}", config.bind_addr))?;

    sessionhub_web::run(endpoint, addr).await
}
