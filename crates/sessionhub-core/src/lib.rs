//! sessionhub-core - analytics pipeline, access control, smart recap
//!
//! Implements the Session Analytics & Smart-Recap Serving Pipeline: access
//! resolution, transcript assembly, card computation, card caching, and
//! smart-recap generation, on top of a Postgres metadata store and an
//! HTTP-backed object store.

pub mod access;
pub mod analytics;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod event;
pub mod models;
pub mod parsers;
pub mod pricing;
pub mod recap;
pub mod store;

pub use access::resolve_access;
pub use analytics::{compute, CardSet};
pub use cache::{all_valid, CardCache, CardWrite, PgCardCache, StoredCard, StoredCardSet};
pub use config::AppConfig;
pub use endpoint::{AnalyticsBody, AnalyticsEndpoint, AnalyticsOutcome};
pub use error::{AssemblyReport, CoreError, LlmError, StoreError};
pub use event::{EventBus, RecapEvent};
pub use recap::{HttpLlmClient, LlmClient, RecapConfig, RecapCoordinator, RecapOutcome};
pub use store::{HttpObjectStore, MetadataStore, ObjectStore, PgMetadataStore};
