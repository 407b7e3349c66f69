//! LLM Client (spec.md §4.6).
//!
//! Single-shot JSON-mode completion request. No pack example talks to an
//! LLM HTTP API directly, but `EffortlessMetrics-agent-backplane`'s
//! `wiremock` dev-dependency is the grounding for testing this client's
//! fault paths (timeout, malformed body, non-2xx) without a live endpoint.

use serde::Deserialize;
use std::time::Duration;

use crate::error::LlmError;

/// Successful LLM analysis result (spec.md §4.6 `analyze`).
#[derive(Debug, Clone, Deserialize)]
pub struct RecapAnalysis {
    pub recap: String,
    #[serde(default)]
    pub went_well: Vec<String>,
    #[serde(default)]
    pub went_bad: Vec<String>,
    #[serde(default)]
    pub human_suggestions: Vec<String>,
    #[serde(default)]
    pub environment_suggestions: Vec<String>,
    #[serde(default)]
    pub default_context_suggestions: Vec<String>,
    #[serde(default)]
    pub suggested_session_title: Option<String>,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(RecapAnalysis, u64), LlmError>;
}

/// `reqwest`-backed LLM client. `base_url` may be redirected to a test
/// endpoint via configuration to support fault-injection tests (spec.md
/// §4.6 "may be redirected to a test endpoint by configuration").
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpLlmClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Constructs a client whose base URL is overridden by
    /// `TEST_SMART_RECAP_BASE_URL` when set (spec.md §4.6, SPEC_FULL.md §11).
    pub fn from_config(client: reqwest::Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url = std::env::var("TEST_SMART_RECAP_BASE_URL").unwrap_or_else(|_| base_url.into());
        Self {
            client,
            base_url,
            api_key: api_key.into(),
        }
    }
}

#[derive(serde::Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    response_format: &'static str,
}

#[async_trait::async_trait]
impl LlmClient for HttpLlmClient {
    async fn analyze(
        &self,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<(RecapAnalysis, u64), LlmError> {
        let started = std::time::Instant::now();
        let request = CompletionRequest {
            model,
            prompt,
            response_format: "json_object",
        };

        let response = self
            .client
            .post(format!("{}/v1/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Transport(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Upstream(format!("status {status}: {body}")));
        }

        let analysis: RecapAnalysis = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let generation_ms = started.elapsed().as_millis() as u64;
        Ok((analysis, generation_ms))
    }
}
