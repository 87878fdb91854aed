//! OpenAI-compatible HTTP gateway.
//!
//! Talks to `/embeddings` and `/chat/completions` on any OpenAI-compatible
//! base URL. Every request is bounded by the configured timeout and retried
//! (bounded, with backoff) on retryable failures only.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument, warn};

use ferry_core::retry::RetryConfig;
use ferry_settings::GatewaySettings;

use crate::errors::{GatewayError, Result};
use crate::gateway::Gateway;

/// OpenAI-compatible gateway over HTTP.
#[derive(Debug)]
pub struct OpenAiGateway {
    settings: GatewaySettings,
    retry: RetryConfig,
    client: reqwest::Client,
}

impl OpenAiGateway {
    /// Create a gateway from settings. Requires an API key.
    pub fn new(settings: GatewaySettings) -> Result<Self> {
        if settings.api_key.as_deref().unwrap_or("").is_empty() {
            return Err(GatewayError::Auth {
                message: "no API key configured (set FERRY_GATEWAY_API_KEY)".into(),
            });
        }
        let retry = RetryConfig {
            max_retries: settings.max_retries,
            ..RetryConfig::default()
        };
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()?;
        Ok(Self {
            settings,
            retry,
            client,
        })
    }

    /// Override the retry policy (tests use short delays).
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = self.settings.api_key.as_deref().unwrap_or("");
        let auth_value = format!("Bearer {key}");
        let _ = headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth_value).map_err(|e| GatewayError::Auth {
                message: format!("invalid API key header: {e}"),
            })?,
        );
        Ok(headers)
    }

    /// POST `body` to `{base_url}/{path}`, with bounded retry on
    /// retryable failures.
    async fn post_with_retry(&self, path: &str, body: &Value) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            match self.post_once(path, body).await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.retry.max_retries => {
                    attempt += 1;
                    let delay_ms = self.retry.delay_for_attempt(attempt);
                    warn!(
                        path,
                        attempt,
                        max_retries = self.retry.max_retries,
                        delay_ms,
                        error = %err,
                        "gateway call failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn post_once(&self, path: &str, body: &Value) -> Result<Value> {
        let url = format!("{}/{path}", self.settings.base_url.trim_end_matches('/'));
        let headers = self.build_headers()?;

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout {
                        timeout_ms: self.settings.timeout_ms,
                    }
                } else {
                    GatewayError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            let message = parse_api_error_message(&body_text);
            let retryable = status.as_u16() == 429 || status.is_server_error();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
                retryable,
            });
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    timeout_ms: self.settings.timeout_ms,
                }
            } else {
                GatewayError::Http(e)
            }
        })
    }
}

/// Pull the human-readable message out of an OpenAI error body.
fn parse_api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| ferry_core::text::truncate_with_suffix(body.trim(), 200, "…"))
}

#[async_trait]
impl Gateway for OpenAiGateway {
    #[instrument(skip_all, fields(model = %self.settings.embedding_model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let body = json!({
            "model": self.settings.embedding_model,
            "input": text,
        });
        let response = self.post_with_retry("embeddings", &body).await?;

        let embedding = response
            .pointer("/data/0/embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| GatewayError::InvalidResponse("missing embedding in response".into()))?;

        let vector: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<_>>()
            .ok_or_else(|| GatewayError::InvalidResponse("non-numeric embedding value".into()))?;

        if vector.len() != self.settings.embedding_dimensions {
            warn!(
                expected = self.settings.embedding_dimensions,
                actual = vector.len(),
                "embedding dimensions differ from settings"
            );
        }
        debug!(dims = vector.len(), "embedding generated");
        Ok(vector)
    }

    #[instrument(skip_all, fields(model = %self.settings.completion_model))]
    async fn complete_structured(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let body = json!({
            "model": self.settings.completion_model,
            "messages": [{"role": "user", "content": prompt}],
            "temperature": 0,
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "routing_decision",
                    "schema": schema,
                    "strict": true,
                },
            },
        });
        let response = self.post_with_retry("chat/completions", &body).await?;

        let content = response
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("missing message content in response".into())
            })?;

        serde_json::from_str(content).map_err(|e| {
            GatewayError::InvalidResponse(format!("structured content is not valid JSON: {e}"))
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
