//! sessionhub-web - HTTP surface for the session analytics pipeline
//!
//! Exposes the single stable route, `GET /api/v1/sessions/{id}/analytics`
//! (spec.md §6), as a thin axum translation layer over
//! `sessionhub_core::AnalyticsEndpoint`.

pub mod router;

pub use router::create_router;

use anyhow::Result;
use sessionhub_core::{AnalyticsEndpoint, LlmClient, MetadataStore, ObjectStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the web server, binding `addr` and serving until the process exits.
pub async fn run<M, O, L>(endpoint: Arc<AnalyticsEndpoint<M, O, L>>, addr: SocketAddr) -> Result<()>
where
    M: MetadataStore + 'static,
    O: ObjectStore + 'static,
    L: LlmClient + 'static,
{
    let router = create_router(endpoint);
    let listener = TcpListener::bind(addr).await?;

    info!("sessionhub-web listening on http://{addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
