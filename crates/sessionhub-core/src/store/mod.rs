//! Storage adapters: the Metadata Store (spec.md §4.8, Postgres via `sqlx`)
//! and the Object Store (spec.md §4.9, HTTP via `reqwest`).
//!
//! Each adapter is a trait plus one concrete implementation, rather than a
//! shared connection-wrapping struct, since the operations are defined
//! independent of a concrete backend, and tests need a fake to exercise the
//! coordinator/endpoint without a live database.

pub mod metadata;
pub mod object;

pub use metadata::{MetadataStore, PgMetadataStore, SessionDetail};
pub use object::{HttpObjectStore, ObjectStore};
