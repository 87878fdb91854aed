//! Commerce unit: commercial-document analysis.
//!
//! Thin handler — OCR/extraction lives outside this crate. This
//! implementation describes the attached document to the gateway and asks
//! for the fields it would extract. A dispatch without an attachment is a
//! failed result, not a guess.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::instrument;

use ferry_core::dispatch::{AgentResult, DispatchContext};
use ferry_core::query::Query;
use ferry_core::unit::Unit;
use ferry_gateway::Gateway;
use ferry_runtime::AgentDispatch;

use crate::util::complete_bounded;

/// Gateway-backed commerce-document handler.
pub struct CommerceUnit {
    gateway: Arc<dyn Gateway>,
}

impl CommerceUnit {
    /// Create the handler.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    fn build_prompt(query: &Query, context: &DispatchContext, filename: &str, mime: &str) -> String {
        format!(
            "You analyze commercial documents (invoices, orders, receipts) for an \
             e-commerce store. A document named {filename} of type {mime} was \
             uploaded. Answer in {language}: describe the document type and the \
             fields you would extract.\n\nUser note:\n{text}",
            language = context.language,
            text = query.text,
        )
    }

    fn response_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string"},
                "documentType": {"type": "string"},
                "fields": {
                    "type": "array",
                    "items": {"type": "string"},
                },
            },
            "required": ["text", "documentType"],
            "additionalProperties": false,
        })
    }
}

#[async_trait]
impl AgentDispatch for CommerceUnit {
    fn unit(&self) -> Unit {
        Unit::Commerce
    }

    #[instrument(skip_all)]
    async fn dispatch(&self, query: &Query, context: &DispatchContext) -> AgentResult {
        let Some(attachment) = &context.attachment else {
            return AgentResult::failed(
                Unit::Commerce,
                "no document attached to a commerce dispatch",
            );
        };

        let prompt =
            Self::build_prompt(query, context, &attachment.filename, &attachment.mime_type);
        match complete_bounded(
            self.gateway.as_ref(),
            &prompt,
            &Self::response_schema(),
            context.timeout_ms,
        )
        .await
        {
            Ok(payload) => AgentResult::ok(Unit::Commerce, payload),
            Err(e) => AgentResult::failed(Unit::Commerce, e.to_string()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
