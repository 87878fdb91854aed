//! Knowledge unit: document knowledge retrieval.
//!
//! Thin handler — the real retrieval/re-ranking pipeline lives outside
//! this crate. This implementation asks the gateway for an answer with the
//! sources it would cite.

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

/// Gateway-backed knowledge handler.
pub struct KnowledgeUnit {
    gateway: Arc<dyn Gateway>,
}

impl KnowledgeUnit {
    /// Create the handler.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    fn build_prompt(query: &Query, context: &DispatchContext) -> String {
        format!(
            "You answer conceptual questions about an e-commerce store's policies, \
             procedures, and documentation. Answer in {language} and name the \
             documents you would cite.{history}\n\nQuestion:\n{text}",
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
                "sources": {
                    "type": "array",
                    "items": {"type": "string"},
                },
            },
            "required": ["text"],
            "additionalProperties": false,
        })
    }
}

#[async_trait]
impl AgentDispatch for KnowledgeUnit {
    fn unit(&self) -> Unit {
        Unit::Knowledge
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
            Ok(payload) => AgentResult::ok(Unit::Knowledge, payload),
            Err(e) => AgentResult::failed(Unit::Knowledge, e.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
