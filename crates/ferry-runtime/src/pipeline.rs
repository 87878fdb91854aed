//! Per-request pipeline state.
//!
//! One [`PipelineState`] exists per in-flight request, owned by that
//! request's task alone, and is destroyed when the request completes or
//! fails. It records what each stage produced and when each stage was
//! entered, for latency accounting.

use std::time::Instant;

use ferry_core::decision::{RouterDecision, SupervisorVerdict};
use ferry_core::dispatch::{AgentResult, ChatMessage};
use ferry_core::events::PipelineStage;
use ferry_core::ids::RequestId;
use ferry_core::query::Query;
use ferry_core::signal::Signal;

use crate::errors::RuntimeError;

/// Mutable context threaded through one request's pipeline stages.
pub struct PipelineState {
    /// This request's ID.
    pub request_id: RequestId,
    /// The immutable input.
    pub query: Query,
    /// Resolved response language.
    pub language: String,
    /// Loaded conversation history (oldest first).
    pub history: Vec<ChatMessage>,
    /// Extracted signals.
    pub signals: Vec<Signal>,
    /// The router's decision, once routing completes.
    pub decision: Option<RouterDecision>,
    /// The supervisor's verdict, once supervision completes.
    pub verdict: Option<SupervisorVerdict>,
    /// The unit's result, once dispatch completes.
    pub result: Option<AgentResult>,
    /// Terminal error description, if the request failed.
    pub error: Option<String>,
    stage: PipelineStage,
    entered: Vec<(PipelineStage, Instant)>,
}

impl PipelineState {
    /// Initialize state for an admitted request.
    #[must_use]
    pub fn new(query: Query) -> Self {
        Self {
            request_id: RequestId::generate(),
            query,
            language: String::new(),
            history: Vec::new(),
            signals: Vec::new(),
            decision: None,
            verdict: None,
            result: None,
            error: None,
            stage: PipelineStage::Received,
            entered: vec![(PipelineStage::Received, Instant::now())],
        }
    }

    /// Current stage.
    #[must_use]
    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    /// Advance to the next stage, enforcing legal transitions.
    ///
    /// Legal: the forward pipeline order, plus `Failed` from any
    /// non-terminal stage.
    pub fn advance(&mut self, next: PipelineStage) -> Result<(), RuntimeError> {
        let legal = match (self.stage, next) {
            (PipelineStage::Received, PipelineStage::Routing)
            | (PipelineStage::Routing, PipelineStage::Supervising)
            | (PipelineStage::Supervising, PipelineStage::Dispatching)
            | (PipelineStage::Dispatching, PipelineStage::Completed) => true,
            (from, PipelineStage::Failed) if !from.is_terminal() => true,
            _ => false,
        };
        if !legal {
            return Err(RuntimeError::Internal(format!(
                "illegal stage transition {} -> {}",
                self.stage.as_str(),
                next.as_str()
            )));
        }
        self.stage = next;
        self.entered.push((next, Instant::now()));
        Ok(())
    }

    /// Milliseconds from admission to now (or to the terminal stage, once
    /// one was entered).
    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        let start = self.entered[0].1;
        let end = self
            .entered
            .last()
            .filter(|(stage, _)| stage.is_terminal())
            .map_or_else(Instant::now, |(_, at)| *at);
        end.duration_since(start).as_millis() as u64
    }

    /// Time spent in each stage, as (stage, milliseconds) pairs in entry
    /// order. The terminal stage has no duration.
    #[must_use]
    pub fn stage_latencies_ms(&self) -> Vec<(PipelineStage, u64)> {
        self.entered
            .windows(2)
            .map(|pair| {
                let (stage, entered) = pair[0];
                let (_, next_entered) = pair[1];
                (stage, next_entered.duration_since(entered).as_millis() as u64)
            })
            .collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn state() -> PipelineState {
        PipelineState::new(Query::text("test"))
    }

    #[test]
    fn new_state_starts_received() {
        let s = state();
        assert_eq!(s.stage(), PipelineStage::Received);
        assert!(s.decision.is_none());
        assert!(s.error.is_none());
    }

    #[test]
    fn request_ids_are_unique_per_state() {
        assert_ne!(state().request_id, state().request_id);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        let mut s = state();
        s.advance(PipelineStage::Routing).unwrap();
        s.advance(PipelineStage::Supervising).unwrap();
        s.advance(PipelineStage::Dispatching).unwrap();
        s.advance(PipelineStage::Completed).unwrap();
        assert_eq!(s.stage(), PipelineStage::Completed);
    }

    #[test]
    fn any_non_terminal_stage_can_fail() {
        for target in [
            PipelineStage::Received,
            PipelineStage::Routing,
            PipelineStage::Supervising,
            PipelineStage::Dispatching,
        ] {
            let mut s = state();
            // Walk forward to the target stage.
            let path = [
                PipelineStage::Routing,
                PipelineStage::Supervising,
                PipelineStage::Dispatching,
            ];
            for next in path.iter() {
                if s.stage() == target {
                    break;
                }
                s.advance(*next).unwrap();
            }
            s.advance(PipelineStage::Failed).unwrap();
            assert_eq!(s.stage(), PipelineStage::Failed);
        }
    }

    #[test]
    fn skipping_stages_is_illegal() {
        let mut s = state();
        assert_matches!(
            s.advance(PipelineStage::Dispatching),
            Err(RuntimeError::Internal(_))
        );
        assert_matches!(
            s.advance(PipelineStage::Completed),
            Err(RuntimeError::Internal(_))
        );
    }

    #[test]
    fn terminal_stages_cannot_advance() {
        let mut s = state();
        s.advance(PipelineStage::Failed).unwrap();
        assert_matches!(
            s.advance(PipelineStage::Routing),
            Err(RuntimeError::Internal(_))
        );
        assert_matches!(
            s.advance(PipelineStage::Failed),
            Err(RuntimeError::Internal(_))
        );
    }

    #[test]
    fn going_backward_is_illegal() {
        let mut s = state();
        s.advance(PipelineStage::Routing).unwrap();
        s.advance(PipelineStage::Supervising).unwrap();
        assert_matches!(
            s.advance(PipelineStage::Routing),
            Err(RuntimeError::Internal(_))
        );
    }

    #[test]
    fn stage_latencies_cover_entered_stages() {
        let mut s = state();
        s.advance(PipelineStage::Routing).unwrap();
        s.advance(PipelineStage::Supervising).unwrap();
        s.advance(PipelineStage::Dispatching).unwrap();
        s.advance(PipelineStage::Completed).unwrap();

        let latencies = s.stage_latencies_ms();
        assert_eq!(latencies.len(), 4);
        assert_eq!(latencies[0].0, PipelineStage::Received);
        assert_eq!(latencies[3].0, PipelineStage::Dispatching);
    }

    #[test]
    fn duration_is_fixed_once_terminal() {
        let mut s = state();
        s.advance(PipelineStage::Failed).unwrap();
        let first = s.duration_ms();
        std::thread::sleep(std::time::Duration::from_millis(5));
        assert_eq!(s.duration_ms(), first);
    }
}
