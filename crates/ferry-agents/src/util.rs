//! Shared helpers for gateway-backed units.

use std::time::Duration;

use serde_json::Value;

use ferry_core::dispatch::{ChatMessage, Role};
use ferry_gateway::{Gateway, GatewayError};

/// Run a structured completion under the dispatch context's timeout.
pub(crate) async fn complete_bounded(
    gateway: &dyn Gateway,
    prompt: &str,
    schema: &Value,
    timeout_ms: u64,
) -> Result<Value, GatewayError> {
    tokio::time::timeout(
        Duration::from_millis(timeout_ms),
        gateway.complete_structured(prompt, schema),
    )
    .await
    .map_err(|_| GatewayError::Timeout { timeout_ms })?
}

/// Render a conversation window as prompt context.
pub(crate) fn history_block(history: &[ChatMessage]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let mut block = String::from("\nConversation so far:\n");
    for message in history {
        let role = match message.role {
            Role::User => "user",
            Role::Assistant => "assistant",
        };
        block.push_str(&format!("{role}: {}\n", message.content));
    }
    block
}
