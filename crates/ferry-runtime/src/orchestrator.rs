//! Pipeline orchestration.
//!
//! Drives one request through routing → supervision → dispatch → response
//! assembly, emitting a status event at every stage transition. Each
//! request owns its `PipelineState` and cancellation token; nothing is
//! shared across requests except the services themselves.

use std::sync::Arc;
use std::time::Duration;

use metrics::{counter, histogram};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use ferry_core::decision::SupervisorVerdict;
use ferry_core::dispatch::{AgentResult, ChatMessage, DispatchContext};
use ferry_core::events::{BaseEvent, PipelineEvent, PipelineStage};
use ferry_core::ids::RequestId;
use ferry_core::query::Query;
use ferry_routing::{Router, Supervisor, signals};
use ferry_settings::FerrySettings;

use crate::conversation::ConversationStore;
use crate::dispatch::DispatchRegistry;
use crate::emitter::EventEmitter;
use crate::errors::RuntimeError;
use crate::pipeline::PipelineState;

/// What a completed request hands back to the caller.
#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    /// The request that completed.
    pub request_id: RequestId,
    /// The supervisor's final verdict.
    pub verdict: SupervisorVerdict,
    /// The unit's answer.
    pub result: AgentResult,
    /// End-to-end latency.
    pub duration_ms: u64,
}

/// The pipeline state machine.
pub struct Orchestrator {
    router: Arc<Router>,
    supervisor: Arc<Supervisor>,
    registry: Arc<DispatchRegistry>,
    conversations: Arc<dyn ConversationStore>,
    emitter: EventEmitter,
    settings: Arc<FerrySettings>,
}

impl Orchestrator {
    /// Wire up the orchestrator from its injected services.
    #[must_use]
    pub fn new(
        router: Arc<Router>,
        supervisor: Arc<Supervisor>,
        registry: Arc<DispatchRegistry>,
        conversations: Arc<dyn ConversationStore>,
        settings: Arc<FerrySettings>,
    ) -> Self {
        Self {
            router,
            supervisor,
            registry,
            conversations,
            emitter: EventEmitter::new(),
            settings,
        }
    }

    /// Subscribe to status events for all requests.
    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.emitter.subscribe()
    }

    /// Handle one request to completion.
    pub async fn handle(&self, query: Query) -> Result<PipelineOutcome, RuntimeError> {
        self.handle_with_cancellation(query, CancellationToken::new())
            .await
    }

    /// Handle one request, abandoning it if `cancel` fires.
    ///
    /// On cancellation the in-flight dispatch (if any) completes in the
    /// background and its result is discarded along with the request
    /// state; no response is produced.
    #[instrument(skip_all, fields(request_id))]
    pub async fn handle_with_cancellation(
        &self,
        query: Query,
        cancel: CancellationToken,
    ) -> Result<PipelineOutcome, RuntimeError> {
        let mut state = PipelineState::new(query);
        tracing::Span::current().record("request_id", state.request_id.as_str());
        let _ = self.emitter.emit(PipelineEvent::Received {
            base: BaseEvent::now(state.request_id.as_str()),
        });

        let outcome = self.run_pipeline(&mut state, &cancel).await;

        match &outcome {
            Ok(done) => {
                counter!("ferry_requests_total", "outcome" => "completed").increment(1);
                let _ = self.emitter.emit(PipelineEvent::Completed {
                    base: BaseEvent::now(state.request_id.as_str()),
                    unit: done.result.unit,
                    duration_ms: done.duration_ms,
                });
                info!(
                    unit = %done.result.unit,
                    duration_ms = done.duration_ms,
                    "request completed"
                );
            }
            Err(e) => {
                counter!("ferry_requests_total", "outcome" => "failed").increment(1);
                let failed_stage = state.stage();
                state.error = Some(e.to_string());
                if let Err(transition_err) = state.advance(PipelineStage::Failed) {
                    warn!(error = %transition_err, "state already terminal while failing");
                }
                let _ = self.emitter.emit(PipelineEvent::Failed {
                    base: BaseEvent::now(state.request_id.as_str()),
                    error: e.user_message().to_owned(),
                    failed_stage,
                });
                warn!(error = %e, stage = failed_stage.as_str(), "request failed");
            }
        }

        histogram!("ferry_request_duration_ms").record(state.duration_ms() as f64);
        outcome
    }

    async fn run_pipeline(
        &self,
        state: &mut PipelineState,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, RuntimeError> {
        let conversation = &self.settings.conversation;
        state.language =
            signals::resolve_language(&state.query, &conversation.default_language);

        if let Some(thread_id) = &state.query.thread_id {
            match self
                .conversations
                .load_history(thread_id, conversation.history_limit)
                .await
            {
                Ok(history) => state.history = history,
                Err(e) => warn!(error = %e, "history unavailable, continuing without it"),
            }
        }

        state.signals = signals::extract(&state.query, &self.settings.routing);

        // ── Routing ──────────────────────────────────────────────────────
        state.advance(PipelineStage::Routing)?;
        let _ = self.emitter.emit(PipelineEvent::Routing {
            base: BaseEvent::now(state.request_id.as_str()),
        });
        let decision = tokio::select! {
            () = cancel.cancelled() => return Err(RuntimeError::Cancelled),
            decision = self.router.route(&state.query, &state.signals) => decision,
        };
        state.decision = Some(decision.clone());

        // ── Supervision ──────────────────────────────────────────────────
        state.advance(PipelineStage::Supervising)?;
        let _ = self.emitter.emit(PipelineEvent::Supervising {
            base: BaseEvent::now(state.request_id.as_str()),
            unit: decision.unit,
            source: decision.source,
            confidence: decision.confidence.value(),
        });
        let verdict = tokio::select! {
            () = cancel.cancelled() => return Err(RuntimeError::Cancelled),
            verdict = self
                .supervisor
                .supervise(&state.query, decision, &state.signals, &state.history) => verdict,
        };
        state.verdict = Some(verdict.clone());

        // ── Dispatch ─────────────────────────────────────────────────────
        state.advance(PipelineStage::Dispatching)?;
        let _ = self.emitter.emit(PipelineEvent::Dispatching {
            base: BaseEvent::now(state.request_id.as_str()),
            unit: verdict.unit,
            escalated: verdict.escalated,
        });
        let result = self.dispatch(state, &verdict, cancel).await?;

        if !result.success {
            return Err(RuntimeError::DispatchFailed {
                unit: verdict.unit,
                detail: result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unit reported failure without detail".into()),
            });
        }

        // ── Response assembly ────────────────────────────────────────────
        self.persist_exchange(state, &result).await;
        state.advance(PipelineStage::Completed)?;
        state.result = Some(result.clone());

        Ok(PipelineOutcome {
            request_id: state.request_id.clone(),
            verdict,
            result,
            duration_ms: state.duration_ms(),
        })
    }

    /// Invoke the target unit under the dispatch timeout.
    ///
    /// The unit call runs as its own task: on cancellation it is left to
    /// finish in the background (its result is discarded); on timeout it
    /// is aborted and the request fails terminally.
    async fn dispatch(
        &self,
        state: &PipelineState,
        verdict: &SupervisorVerdict,
        cancel: &CancellationToken,
    ) -> Result<AgentResult, RuntimeError> {
        let timeout_ms = self.settings.dispatch.timeout_ms;
        let context = DispatchContext {
            request_id: state.request_id.clone(),
            language: state.language.clone(),
            history: tail(&state.history, self.settings.conversation.context_window),
            attachment: state.query.attachment.clone(),
            escalated: verdict.escalated,
            timeout_ms,
        };

        let handler = self.registry.for_unit(verdict.unit);
        let query = state.query.clone();
        let mut task =
            tokio::spawn(async move { handler.dispatch(&query, &context).await });
        let abort = task.abort_handle();

        tokio::select! {
            () = cancel.cancelled() => {
                // Leave the task running; its result arrives into a dropped
                // handle and is discarded with the request state.
                Err(RuntimeError::Cancelled)
            }
            joined = tokio::time::timeout(Duration::from_millis(timeout_ms), &mut task) => {
                match joined {
                    Ok(Ok(result)) => Ok(result),
                    Ok(Err(join_err)) => Err(RuntimeError::Internal(format!(
                        "dispatch task failed: {join_err}"
                    ))),
                    Err(_) => {
                        abort.abort();
                        counter!("ferry_dispatch_timeouts_total").increment(1);
                        Err(RuntimeError::DispatchTimeout {
                            unit: verdict.unit,
                            timeout_ms,
                        })
                    }
                }
            }
        }
    }

    /// Append the completed exchange to the conversation thread.
    /// Best-effort: persistence failures never fail the request.
    async fn persist_exchange(&self, state: &PipelineState, result: &AgentResult) {
        let Some(thread_id) = &state.query.thread_id else {
            return;
        };
        let user = ChatMessage::user(state.query.text.clone());
        let assistant = ChatMessage::assistant_from(result.unit, answer_text(result));
        for message in [user, assistant] {
            if let Err(e) = self.conversations.append_message(thread_id, message).await {
                warn!(error = %e, "failed to persist conversation message");
                return;
            }
        }
    }
}

/// The displayable answer text of a unit payload.
fn answer_text(result: &AgentResult) -> String {
    result
        .payload
        .get("text")
        .and_then(Value::as_str)
        .map_or_else(|| result.payload.to_string(), str::to_owned)
}

/// Last `limit` elements of a slice.
fn tail<T: Clone>(items: &[T], limit: usize) -> Vec<T> {
    items[items.len().saturating_sub(limit)..].to_vec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
