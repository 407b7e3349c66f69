//! Smart-Recap Coordinator (spec.md §4.5).
//!
//! Orchestrates the cache-hit/miss, quota, and lock dance around a single
//! LLM call per session. The background generation task runs detached from
//! the HTTP request's cancellation (spec.md §4.7 "Cancellation of the
//! request context aborts foreground work; it does NOT abort the
//! background recap task"), via a detached `tokio::spawn` task that keeps
//! running after the request future is dropped.

pub mod llm;

pub use llm::{HttpLlmClient, LlmClient, RecapAnalysis};

use chrono::Utc;
use sessionhub_types::{SessionId, SmartRecapCard, SmartRecapQuotaView, SmartRecapStatus, UserId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::event::{EventBus, RecapEvent};
use crate::parsers::assembler::assemble_chunks;
use crate::store::{MetadataStore, ObjectStore};

/// Configuration loaded once at startup (spec.md §4.5 table).
#[derive(Debug, Clone)]
pub struct RecapConfig {
    pub enabled: bool,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub quota_limit: u32,
    pub lock_timeout: Duration,
    /// Advisory only; not used to invalidate cached cards in this design
    /// (spec.md §4.5).
    pub staleness_minutes: u32,
}

impl RecapConfig {
    /// The feature is fully usable only with both an API key and model
    /// configured in addition to the master switch (spec.md §4.5).
    pub fn is_usable(&self) -> bool {
        self.enabled && self.api_key.is_some() && self.model.is_some()
    }
}

/// Result of running the coordinator for one analytics request.
#[derive(Debug, Clone, Default)]
pub struct RecapOutcome {
    pub status: Option<SmartRecapStatus>,
    pub quota_view: Option<SmartRecapQuotaView>,
    pub card_error: Option<String>,
}

pub struct RecapCoordinator<S: MetadataStore + 'static, O: ObjectStore + 'static, L: LlmClient + 'static> {
    store: Arc<S>,
    objects: Arc<O>,
    llm: Arc<L>,
    config: RecapConfig,
    events: EventBus,
}

impl<S: MetadataStore + 'static, O: ObjectStore + 'static, L: LlmClient + 'static> RecapCoordinator<S, O, L> {
    pub fn new(store: Arc<S>, objects: Arc<O>, llm: Arc<L>, config: RecapConfig, events: EventBus) -> Self {
        Self {
            store,
            objects,
            llm,
            config,
            events,
        }
    }

    /// Run the coordinator for one analytics request (spec.md §4.5, steps
    /// 1-6). `transcript_bytes` is `Some` when the endpoint already
    /// recomputed base cards this request and can shortcut the background
    /// task's own download; otherwise the background task downloads and
    /// assembles the transcript itself via `external_id`/`transcript_filename`
    /// (spec.md §4.5 step 6, §4.2).
    #[allow(clippy::too_many_arguments)]
    pub async fn on_analytics_request(
        &self,
        session: SessionId,
        owner: UserId,
        external_id: String,
        transcript_filename: String,
        viewer_is_owner: bool,
        watermark: u64,
        transcript_bytes: Option<Vec<u8>>,
        base_card_summary: String,
    ) -> RecapOutcome {
        let mut outcome = RecapOutcome::default();

        let quota = match self.store.reset_smart_recap_quota_if_needed(owner).await {
            Ok(quota) => quota,
            Err(e) => {
                warn!(error = %e, "failed to read smart-recap quota");
                return outcome;
            }
        };
        let exceeded = quota.count >= self.config.quota_limit;

        if viewer_is_owner {
            outcome.quota_view = Some(SmartRecapQuotaView {
                used: quota.count,
                limit: self.config.quota_limit,
                exceeded,
            });
        }

        // Step 3: cache hit — attach verbatim, no staleness check, no
        // regeneration (spec.md §4.5, SPEC_FULL.md §14).
        match self.store.get_smart_recap_card(session).await {
            Ok(Some(card)) => {
                outcome.status = Some(SmartRecapStatus::Present(card));
                return outcome;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(error = %e, "failed to read smart-recap card");
            }
        }

        if let Ok(Some(failure)) = self.store.take_smart_recap_failure(session).await {
            outcome.card_error = Some(failure);
        }

        if !self.config.is_usable() {
            return outcome;
        }
        if exceeded {
            // Quota exceeded has no card_error entry (spec.md §4.5 step 4).
            outcome.card_error = None;
            return outcome;
        }

        let token = Uuid::new_v4().to_string();
        let acquired = match self
            .store
            .acquire_smart_recap_lock(session, self.config.lock_timeout, &token)
            .await
        {
            Ok(acquired) => acquired,
            Err(e) => {
                warn!(error = %e, "failed to acquire smart-recap lock");
                return outcome;
            }
        };

        if !acquired {
            outcome.status = Some(SmartRecapStatus::Generating);
            return outcome;
        }

        outcome.status = Some(SmartRecapStatus::Generating);
        self.events.publish(RecapEvent::Started(session));
        self.spawn_generation(
            session,
            owner,
            external_id,
            transcript_filename,
            watermark,
            transcript_bytes,
            base_card_summary,
        );
        outcome
    }

    #[allow(clippy::too_many_arguments)]
    fn spawn_generation(
        &self,
        session: SessionId,
        owner: UserId,
        external_id: String,
        transcript_filename: String,
        watermark: u64,
        transcript_bytes: Option<Vec<u8>>,
        base_card_summary: String,
    ) {
        let store = Arc::clone(&self.store);
        let objects = Arc::clone(&self.objects);
        let llm = Arc::clone(&self.llm);
        let events = self.events.clone();
        let model = self.config.model.clone().unwrap_or_default();

        tokio::spawn(async move {
            let deadline = Duration::from_secs(90);
            let result = tokio::time::timeout(
                deadline,
                run_generation(
                    store.clone(),
                    objects,
                    llm,
                    session,
                    owner,
                    external_id,
                    transcript_filename,
                    watermark,
                    transcript_bytes,
                    base_card_summary,
                    model,
                ),
            )
            .await;

            match result {
                Ok(Ok(())) => {
                    events.publish(RecapEvent::Completed(session));
                }
                Ok(Err(message)) => {
                    error!(session = %session, error = %message, "smart-recap generation failed");
                    let _ = store.record_smart_recap_failure(session, &message).await;
                    let _ = store.clear_smart_recap_lock(session).await;
                    events.publish(RecapEvent::Failed(session, message));
                }
                Err(_) => {
                    let message = "generation exceeded 90s deadline".to_string();
                    error!(session = %session, "smart-recap generation timed out");
                    let _ = store.record_smart_recap_failure(session, &message).await;
                    let _ = store.clear_smart_recap_lock(session).await;
                    events.publish(RecapEvent::Failed(session, message));
                }
            }
        });
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_generation<S: MetadataStore, O: ObjectStore, L: LlmClient>(
    store: Arc<S>,
    objects: Arc<O>,
    llm: Arc<L>,
    session: SessionId,
    owner: UserId,
    external_id: String,
    transcript_filename: String,
    watermark: u64,
    transcript_bytes: Option<Vec<u8>>,
    base_card_summary: String,
    model: String,
) -> Result<(), String> {
    let transcript_bytes = match transcript_bytes {
        Some(bytes) => Some(bytes),
        None => {
            info!(session = %session, "smart-recap background task downloading transcript");
            let chunks = objects
                .list_chunks(owner, &external_id, &transcript_filename)
                .await
                .map_err(|e| e.to_string())?;
            assemble_chunks(chunks).map_err(|e| e.to_string())?
        }
    };

    let prompt = format!(
        "Summarize this coding session.\n\nStatistics:\n{base_card_summary}\n\nTranscript:\n{}",
        transcript_bytes
            .map(|b| String::from_utf8_lossy(&b).to_string())
            .unwrap_or_default()
    );

    let (analysis, generation_ms) = llm
        .analyze(&model, &prompt, Duration::from_secs(60))
        .await
        .map_err(|e| e.to_string())?;

    let card = SmartRecapCard {
        recap: analysis.recap,
        went_well: analysis.went_well,
        went_bad: analysis.went_bad,
        human_suggestions: analysis.human_suggestions,
        environment_suggestions: analysis.environment_suggestions,
        default_context_suggestions: analysis.default_context_suggestions,
        model_used: model,
        input_tokens: analysis.input_tokens,
        output_tokens: analysis.output_tokens,
        generation_ms,
        suggested_session_title: analysis.suggested_session_title.clone(),
        computed_at: Utc::now(),
        up_to_line: watermark,
    };

    store
        .upsert_smart_recap_card(session, &card)
        .await
        .map_err(|e| e.to_string())?;
    store
        .clear_smart_recap_lock(session)
        .await
        .map_err(|e| e.to_string())?;
    store
        .increment_smart_recap_quota(owner)
        .await
        .map_err(|e| e.to_string())?;

    if let Some(title) = analysis.suggested_session_title {
        let _ = store.update_session_suggested_title(session, &title).await;
    }

    Ok(())
}
