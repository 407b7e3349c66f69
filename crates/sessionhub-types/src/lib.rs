//! sessionhub-types - Shared data types for sessionhub
//!
//! Pure data structures without heavy dependencies: no tokio, no async
//! runtime, no database driver. Just serde-serializable shapes shared
//! between `sessionhub-core` (pipeline logic) and `sessionhub-web` (HTTP
//! surface) so the wire format lives in one place.

pub mod access;
pub mod cards;
pub mod ids;

pub use access::{AccessType, AccessInfo, FieldMask};
pub use cards::{
    CardErrorMap, CardName, CompactionCard, CompactionTrigger, CostCard, SmartRecapCard,
    SmartRecapQuotaView, SmartRecapStatus, TokensCard, ToolStat, ToolsCard,
};
pub use ids::{SessionId, UserId};
