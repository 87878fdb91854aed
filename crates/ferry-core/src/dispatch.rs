//! Dispatch contract types shared between the orchestrator and the units.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::RequestId;
use crate::query::Attachment;
use crate::unit::Unit;

/// Role of a conversation message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// End user.
    User,
    /// Assistant answer.
    Assistant,
}

/// One message in a conversation thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Who said it.
    pub role: Role,
    /// Message text.
    pub content: String,
    /// For assistant messages, the unit that produced the answer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<Unit>,
}

impl ChatMessage {
    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            unit: None,
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            unit: None,
        }
    }

    /// An assistant message attributed to the unit that produced it.
    #[must_use]
    pub fn assistant_from(unit: Unit, content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            unit: Some(unit),
        }
    }
}

/// Context handed to a processing unit along with the query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchContext {
    /// Request being served.
    pub request_id: RequestId,
    /// Response language (detected or hinted).
    pub language: String,
    /// Recent conversation window, oldest first.
    pub history: Vec<ChatMessage>,
    /// Attachment descriptor, if the query carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    /// Whether the supervisor escalated this request for clarification.
    pub escalated: bool,
    /// Time the unit has to answer; the orchestrator enforces it too.
    #[serde(rename = "timeoutMs")]
    pub timeout_ms: u64,
}

/// Result returned by a processing unit for one dispatch.
///
/// Units report failure through the `success`/`error` pair instead of an
/// error channel, so a dispatch call itself never "raises" — the
/// orchestrator decides what a failed result means for the request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    /// Unit that produced the result.
    pub unit: Unit,
    /// Unit-defined payload (answer text, rows, extracted fields, ...).
    pub payload: Value,
    /// Whether the unit considers the dispatch successful.
    pub success: bool,
    /// Error detail when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResult {
    /// A successful result.
    #[must_use]
    pub fn ok(unit: Unit, payload: Value) -> Self {
        Self {
            unit,
            payload,
            success: true,
            error: None,
        }
    }

    /// A failed result with detail.
    #[must_use]
    pub fn failed(unit: Unit, error: impl Into<String>) -> Self {
        Self {
            unit,
            payload: Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
