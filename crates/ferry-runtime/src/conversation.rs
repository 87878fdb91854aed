//! Conversation persistence interface.
//!
//! External to the routing core: the orchestrator loads a bounded history
//! window before routing and appends the exchange after completion.
//! Failures are logged and never fatal to a request.

use async_trait::async_trait;
use dashmap::DashMap;

use ferry_core::dispatch::ChatMessage;
use ferry_core::ids::ThreadId;

use crate::errors::ConversationError;

/// Persistence boundary for conversation threads.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a message to a thread (creating the thread if needed).
    async fn append_message(
        &self,
        thread_id: &ThreadId,
        message: ChatMessage,
    ) -> Result<(), ConversationError>;

    /// Load the last `limit` messages of a thread, oldest first.
    async fn load_history(
        &self,
        thread_id: &ThreadId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ConversationError>;
}

/// In-memory conversation store.
#[derive(Default)]
pub struct InMemoryConversationStore {
    threads: DashMap<ThreadId, Vec<ChatMessage>>,
}

impl InMemoryConversationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads with at least one message.
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append_message(
        &self,
        thread_id: &ThreadId,
        message: ChatMessage,
    ) -> Result<(), ConversationError> {
        self.threads
            .entry(thread_id.clone())
            .or_default()
            .push(message);
        Ok(())
    }

    async fn load_history(
        &self,
        thread_id: &ThreadId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, ConversationError> {
        Ok(self
            .threads
            .get(thread_id)
            .map(|messages| {
                let start = messages.len().saturating_sub(limit);
                messages[start..].to_vec()
            })
            .unwrap_or_default())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
