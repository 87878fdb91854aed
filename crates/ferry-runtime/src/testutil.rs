//! Scriptable processing-unit stubs for tests.
//!
//! Real units live outside the routing core; tests (here and in dependent
//! crates) dispatch against these instead.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use ferry_core::dispatch::{AgentResult, DispatchContext};
use ferry_core::query::Query;
use ferry_core::unit::Unit;

use crate::dispatch::AgentDispatch;

/// How a [`StubUnit`] responds to dispatch.
#[derive(Clone, Copy, Debug)]
pub enum StubBehavior {
    /// Answer successfully after an optional delay.
    Succeed,
    /// Report a unit-internal failure.
    Fail,
    /// Sleep far past any reasonable dispatch timeout, then answer.
    Hang,
}

/// A processing unit whose behavior is fixed at construction.
pub struct StubUnit {
    unit: Unit,
    behavior: StubBehavior,
    dispatch_count: AtomicU64,
}

impl StubUnit {
    /// A unit that answers successfully.
    #[must_use]
    pub fn succeeding(unit: Unit) -> Self {
        Self::with_behavior(unit, StubBehavior::Succeed)
    }

    /// A unit with the given behavior.
    #[must_use]
    pub fn with_behavior(unit: Unit, behavior: StubBehavior) -> Self {
        Self {
            unit,
            behavior,
            dispatch_count: AtomicU64::new(0),
        }
    }

    /// How many times this unit was dispatched to.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatch_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentDispatch for StubUnit {
    fn unit(&self) -> Unit {
        self.unit
    }

    async fn dispatch(&self, query: &Query, context: &DispatchContext) -> AgentResult {
        let _ = self.dispatch_count.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            StubBehavior::Succeed => AgentResult::ok(
                self.unit,
                json!({
                    "text": format!("{} answer for: {}", self.unit, query.text),
                    "language": context.language,
                    "escalated": context.escalated,
                }),
            ),
            StubBehavior::Fail => AgentResult::failed(self.unit, "stub unit failure"),
            StubBehavior::Hang => {
                // Far past the dispatch timeout; the orchestrator must cut
                // this off, not wait it out.
                tokio::time::sleep(Duration::from_secs(3_600)).await;
                AgentResult::ok(self.unit, json!({"text": "too late"}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::ids::RequestId;

    fn context() -> DispatchContext {
        DispatchContext {
            request_id: RequestId::new("req_1"),
            language: "en-US".into(),
            history: vec![],
            attachment: None,
            escalated: false,
            timeout_ms: 100,
        }
    }

    #[tokio::test]
    async fn succeeding_stub_answers() {
        let stub = StubUnit::succeeding(Unit::Knowledge);
        let result = stub.dispatch(&Query::text("policy?"), &context()).await;
        assert!(result.success);
        assert_eq!(result.unit, Unit::Knowledge);
        assert_eq!(stub.dispatch_count(), 1);
    }

    #[tokio::test]
    async fn failing_stub_reports_failure() {
        let stub = StubUnit::with_behavior(Unit::Commerce, StubBehavior::Fail);
        let result = stub.dispatch(&Query::text("q"), &context()).await;
        assert!(!result.success);
        assert!(result.error.is_some());
    }
}
