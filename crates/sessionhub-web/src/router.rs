//! Axum router for the analytics endpoint (spec.md §4.7, §6).
//!
//! One route, `GET /api/v1/sessions/{id}/analytics`, backed by
//! `sessionhub_core::AnalyticsEndpoint`. Status-code mapping and the
//! `{"cards": {...}}` wire envelope live here, not in `sessionhub-core`, so
//! the endpoint's own orchestration stays testable without an HTTP server.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};
use sessionhub_core::{AnalyticsBody, AnalyticsEndpoint, AnalyticsOutcome, LlmClient, MetadataStore, ObjectStore};
use sessionhub_types::{SessionId, UserId};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::error;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct AnalyticsQuery {
    as_of_line: Option<String>,
}

/// Wire-shape wrapper: `{"cards": {...}, card_errors, ...}` (spec.md §6).
/// Kept distinct from `AnalyticsBody` so the core crate's aggregate stays a
/// plain data type independent of the HTTP contract's field nesting.
#[derive(Debug, Serialize)]
struct AnalyticsResponse {
    cards: Cards,
    #[serde(skip_serializing_if = "Option::is_none")]
    card_errors: Option<sessionhub_types::CardErrorMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_error_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    smart_recap_quota: Option<sessionhub_types::SmartRecapQuotaView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_session_title: Option<String>,
}

#[derive(Debug, Serialize)]
struct Cards {
    tokens: sessionhub_types::TokensCard,
    cost: sessionhub_types::CostCard,
    compaction: sessionhub_types::CompactionCard,
    tools: sessionhub_types::ToolsCard,
    #[serde(skip_serializing_if = "Option::is_none")]
    smart_recap: Option<sessionhub_types::SmartRecapStatus>,
}

impl From<AnalyticsBody> for AnalyticsResponse {
    fn from(body: AnalyticsBody) -> Self {
        Self {
            cards: Cards {
                tokens: body.tokens,
                cost: body.cost,
                compaction: body.compaction,
                tools: body.tools,
                smart_recap: body.smart_recap,
            },
            card_errors: body.card_errors,
            validation_error_count: body.validation_error_count,
            smart_recap_quota: body.smart_recap_quota,
            suggested_session_title: body.suggested_session_title,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: message.into() })).into_response()
}

/// Reads an optional `Authorization: Bearer <user-uuid>` header as the
/// viewer's identity. This endpoint's auth is "optional" (spec.md §6); no
/// session/cookie scheme is specified by the distilled spec, so viewer
/// identity is accepted pre-resolved as a bearer UUID, consistent with the
/// rest of the system treating `UserId` as an opaque authenticated subject.
fn extract_viewer(headers: &HeaderMap) -> Result<Option<UserId>, Response> {
    let Some(value) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "invalid authorization header"))?;
    let token = value
        .strip_prefix("Bearer ")
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, "expected Bearer authorization"))?;
    let uuid: Uuid = token
        .parse()
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "invalid bearer token"))?;
    Ok(Some(UserId::new(uuid)))
}

async fn analytics_handler<M, O, L>(
    State(endpoint): State<Arc<AnalyticsEndpoint<M, O, L>>>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<AnalyticsQuery>,
    headers: HeaderMap,
) -> Response
where
    M: MetadataStore + 'static,
    O: ObjectStore + 'static,
    L: LlmClient + 'static,
{
    let viewer = match extract_viewer(&headers) {
        Ok(viewer) => viewer,
        Err(response) => return response,
    };

    let as_of_line = match query.as_of_line.as_deref().map(str::parse::<u64>) {
        None => None,
        Some(Ok(n)) => Some(n),
        Some(Err(_)) => {
            return error_response(StatusCode::BAD_REQUEST, "as_of_line must be a non-negative integer")
        }
    };

    let session = SessionId::new(session_id);
    match endpoint.handle(session, viewer, as_of_line).await {
        Ok(AnalyticsOutcome::Ok(body)) => {
            (StatusCode::OK, Json(AnalyticsResponse::from(body))).into_response()
        }
        Ok(AnalyticsOutcome::NotModified) => StatusCode::NOT_MODIFIED.into_response(),
        Ok(AnalyticsOutcome::Unauthenticated) => {
            error_response(StatusCode::UNAUTHORIZED, "sign in to view this session")
        }
        Ok(AnalyticsOutcome::Forbidden) => error_response(StatusCode::FORBIDDEN, "session owner is inactive"),
        Ok(AnalyticsOutcome::NotFound) => error_response(StatusCode::NOT_FOUND, "session not found"),
        Err(e) => {
            error!(error = %e, "analytics endpoint failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
        }
    }
}

/// Build the router for a concrete set of adapter implementations. The bin
/// crate wires this up with `PgMetadataStore` / `HttpObjectStore` /
/// `HttpLlmClient`; tests wire it with fakes.
pub fn create_router<M, O, L>(endpoint: Arc<AnalyticsEndpoint<M, O, L>>) -> Router
where
    M: MetadataStore + 'static,
    O: ObjectStore + 'static,
    L: LlmClient + 'static,
{
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/sessions/{id}/analytics", get(analytics_handler::<M, O, L>))
        .layer(cors)
        .with_state(endpoint)
}
