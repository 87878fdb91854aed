//! Analytics unit: structured-data questions.
//!
//! Thin handler — the real SQL generation/execution pipeline lives outside
//! this crate. This implementation asks the gateway for an answer plus the
//! query it would run, and reports gateway failure as a failed dispatch.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use ferry_core::dispatch::{AgentResult, DispatchContext};
use ferry_core::query::Query;
use ferry_core::unit::Unit;
use ferry_gateway::Gateway;
use ferry_runtime::AgentDispatch;

use crate::util::{complete_bounded, history_block};

/// Gateway-backed analytics handler.
pub struct AnalyticsUnit {
    gateway: Arc<dyn Gateway>,
}

impl AnalyticsUnit {
    /// Create the handler.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    fn build_prompt(query: &Query, context: &DispatchContext) -> String {
        format!(
            "You answer analytics questions about an e-commerce store's orders, \
             products, and customers. Answer in {language}. Describe the result and \
             the SQL you would run.{history}\n\nQuestion:\n{text}",
            language = context.language,
            history = history_block(&context.history),
            text = query.text,
        )
    }

    fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "sql": {"type": "string"},
            },
            "required": ["text"],
            "additionalProperties": false,
        })
    }
}

#[async_trait]
impl AgentDispatch for AnalyticsUnit {
    fn unit(&self) -> Unit {
        Unit::Analytics
    }

    #[instrument(skip_all)]
    async fn dispatch(&self, query: &Query, context: &DispatchContext) -> AgentResult {
        let prompt = Self::build_prompt(query, context);
        match complete_bounded(
            self.gateway.as_ref(),
            &prompt,
            &Self::response_schema(),
            context.timeout_ms,
        )
        .await
        {
            Ok(payload) => AgentResult::ok(Unit::Analytics, payload),
            Err(e) => AgentResult::failed(Unit::Analytics, e.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
