//! Analytics Endpoint orchestration (spec.md §4.7).
//!
//! The HTTP-specific parts (status codes, query parsing) live in
//! `sessionhub-web`; this module is the pure "what to compute and in what
//! order" sequencing of access resolution, watermark comparison, card
//! cache, and the recap coordinator, so it can be exercised without an
//! axum server.

use sessionhub_types::{AccessInfo, AccessType, CardErrorMap, CardName, SessionId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use crate::analytics::compute;
use crate::cache::{all_valid, CardCache, CardWrite};
use crate::error::CoreError;
use crate::models::domain::FileType;
use crate::parsers::assembler::{assemble_chunks, parse_transcript_lines, TranscriptAssembler};
use crate::recap::{LlmClient, RecapCoordinator};
use crate::store::{MetadataStore, ObjectStore};

/// Outcome of `AnalyticsEndpoint::handle`, already decided down to the HTTP
/// status the caller should return (spec.md §6).
pub enum AnalyticsOutcome {
    NotModified,
    Ok(AnalyticsBody),
    Unauthenticated,
    Forbidden,
    NotFound,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AnalyticsBody {
    pub tokens: sessionhub_types::TokensCard,
    pub cost: sessionhub_types::CostCard,
    pub compaction: sessionhub_types::CompactionCard,
    pub tools: sessionhub_types::ToolsCard,
    pub smart_recap: Option<sessionhub_types::SmartRecapStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_errors: Option<CardErrorMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_error_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smart_recap_quota: Option<sessionhub_types::SmartRecapQuotaView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_session_title: Option<String>,
}

pub struct AnalyticsEndpoint<M, O, L>
where
    M: MetadataStore + 'static,
    O: ObjectStore + 'static,
    L: LlmClient + 'static,
{
    metadata: Arc<M>,
    objects: Arc<O>,
    cache: Arc<dyn CardCache>,
    recap: Arc<RecapCoordinator<M, O, L>>,
}

impl<M, O, L> AnalyticsEndpoint<M, O, L>
where
    M: MetadataStore + 'static,
    O: ObjectStore + 'static,
    L: LlmClient + 'static,
{
    pub fn new(
        metadata: Arc<M>,
        objects: Arc<O>,
        cache: Arc<dyn CardCache>,
        recap: Arc<RecapCoordinator<M, O, L>>,
    ) -> Self {
        Self {
            metadata,
            objects,
            cache,
            recap,
        }
    }

    /// `GET /sessions/{id}/analytics[?as_of_line=N]` (spec.md §4.7).
    pub async fn handle(
        &self,
        session: SessionId,
        viewer: Option<sessionhub_types::UserId>,
        as_of_line: Option<u64>,
    ) -> Result<AnalyticsOutcome, CoreError> {
        let access = match self.metadata.get_session_access_type(session, viewer).await {
            Ok(access) => access,
            Err(CoreError::OwnerInactive) => return Ok(AnalyticsOutcome::Forbidden),
            Err(CoreError::NotFound(_)) => return Ok(AnalyticsOutcome::NotFound),
            Err(e) => return Err(e),
        };

        if !access.access_type.has_access() {
            return Ok(translate_no_access(&access, viewer));
        }

        let (owner, external_id) = self.metadata.get_session_owner_and_external_id(session).await?;
        let sync_files = self.metadata.get_sync_files(session).await?;

        let transcript_file = sync_files
            .iter()
            .find(|f| f.file_type == FileType::Transcript);
        let watermark: u64 = sync_files.iter().map(|f| f.last_synced_line).sum();

        if transcript_file.is_none() {
            return Ok(AnalyticsOutcome::Ok(AnalyticsBody::default()));
        }
        let transcript_filename = transcript_file.map(|f| f.filename.clone()).unwrap_or_default();

        if let Some(as_of_line) = as_of_line {
            if as_of_line >= watermark {
                return Ok(AnalyticsOutcome::NotModified);
            }
        }

        let required = CardName::base_cards();
        let cached = self.cache.get(session).await?;

        let (mut body, transcript_bytes, base_card_summary) = if all_valid(&cached, &required, watermark) {
            let body = body_from_cache(&cached);
            let summary = summarize(&body);
            (body, None, summary)
        } else {
            let transcript_chunks = self
                .objects
                .list_chunks(owner, &external_id, &transcript_filename)
                .await?;
            let transcript_bytes = assemble_chunks(transcript_chunks)?;
            let (transcript_events, mut report) = match &transcript_bytes {
                Some(bytes) => parse_transcript_lines(bytes),
                None => (vec![], crate::error::AssemblyReport::new()),
            };

            let mut agent_events_by_id = HashMap::new();
            for file in sync_files.iter().filter(|f| f.file_type == FileType::Agent) {
                let Some(agent_id) = TranscriptAssembler::agent_id(&file.filename) else {
                    continue;
                };
                match self
                    .objects
                    .list_chunks(owner, &external_id, &file.filename)
                    .await
                {
                    Ok(chunks) => {
                        if let Ok(Some(bytes)) = assemble_chunks(chunks) {
                            let (events, agent_report) = parse_transcript_lines(&bytes);
                            report.merge(agent_report);
                            agent_events_by_id.insert(agent_id.to_string(), events);
                        }
                    }
                    Err(e) => {
                        warn!(agent_id, error = %e, "agent file chunks failed to list, skipping");
                    }
                }
            }

            let cards = compute(&transcript_events, &agent_events_by_id);
            self.cache
                .upsert(
                    session,
                    &[
                        CardWrite {
                            card: CardName::Tokens,
                            schema_version: CardName::Tokens.schema_version(),
                            up_to_line: watermark,
                            payload: serde_json::to_value(&cards.tokens).unwrap(),
                        },
                        CardWrite {
                            card: CardName::Cost,
                            schema_version: CardName::Cost.schema_version(),
                            up_to_line: watermark,
                            payload: serde_json::to_value(&cards.cost).unwrap(),
                        },
                        CardWrite {
                            card: CardName::Compaction,
                            schema_version: CardName::Compaction.schema_version(),
                            up_to_line: watermark,
                            payload: serde_json::to_value(&cards.compaction).unwrap(),
                        },
                        CardWrite {
                            card: CardName::Tools,
                            schema_version: CardName::Tools.schema_version(),
                            up_to_line: watermark,
                            payload: serde_json::to_value(&cards.tools).unwrap(),
                        },
                    ],
                )
                .await?;

            let body = AnalyticsBody {
                tokens: cards.tokens,
                cost: cards.cost,
                compaction: cards.compaction,
                tools: cards.tools,
                smart_recap: None,
                card_errors: None,
                validation_error_count: Some(report.validation_error_count()),
                smart_recap_quota: None,
                suggested_session_title: None,
            };
            let summary = summarize(&body);
            (body, transcript_bytes, summary)
        };

        let recap_outcome = self
            .recap
            .on_analytics_request(
                session,
                owner,
                external_id.clone(),
                transcript_filename.clone(),
                access.access_type == AccessType::Owner,
                watermark,
                transcript_bytes,
                base_card_summary,
            )
            .await;

        body.smart_recap = recap_outcome.status;
        body.smart_recap_quota = recap_outcome.quota_view;
        if let Some(message) = recap_outcome.card_error {
            body.card_errors
                .get_or_insert_with(CardErrorMap::new)
                .insert(CardName::SmartRecap.as_str().to_string(), message);
        }

        Ok(AnalyticsOutcome::Ok(body))
    }
}

fn translate_no_access(
    access: &AccessInfo,
    viewer: Option<sessionhub_types::UserId>,
) -> AnalyticsOutcome {
    if access.auth_may_help && viewer.is_none() {
        AnalyticsOutcome::Unauthenticated
    } else {
        AnalyticsOutcome::NotFound
    }
}

fn body_from_cache(cached: &crate::cache::StoredCardSet) -> AnalyticsBody {
    let mut body = AnalyticsBody::default();
    if let Some(stored) = cached.get(&CardName::Tokens) {
        if let Ok(tokens) = serde_json::from_value(stored.payload.clone()) {
            body.tokens = tokens;
        }
    }
    if let Some(stored) = cached.get(&CardName::Cost) {
        if let Ok(cost) = serde_json::from_value(stored.payload.clone()) {
            body.cost = cost;
        }
    }
    if let Some(stored) = cached.get(&CardName::Compaction) {
        if let Ok(compaction) = serde_json::from_value(stored.payload.clone()) {
            body.compaction = compaction;
        }
    }
    if let Some(stored) = cached.get(&CardName::Tools) {
        if let Ok(tools) = serde_json::from_value(stored.payload.clone()) {
            body.tools = tools;
        }
    }
    body
}

fn summarize(body: &AnalyticsBody) -> String {
    format!(
        "tokens: input={} output={} cache_read={} cache_creation={}; cost_usd={:.4}; tools={}",
        body.tokens.input,
        body.tokens.output,
        body.tokens.cache_read,
        body.tokens.cache_creation,
        body.cost.estimated_usd,
        body.tools.by_tool.len()
    )
}
