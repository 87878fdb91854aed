//! Agent dispatch interface and registry.
//!
//! Processing units are external collaborators behind one uniform
//! contract. The registry holds exactly one handler per unit of the closed
//! set, and dispatch resolves through a single match over the unit tag —
//! there is no dynamic unit discovery.

use std::sync::Arc;

use async_trait::async_trait;

use ferry_core::dispatch::{AgentResult, DispatchContext};
use ferry_core::query::Query;
use ferry_core::unit::Unit;

/// Uniform contract for invoking a processing unit.
///
/// Implementations report failure through the result's `success`/`error`
/// pair — a dispatch call itself never errors. They should respect
/// `context.timeout_ms`; the orchestrator enforces it regardless.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AgentDispatch: Send + Sync {
    /// Which unit this handler serves.
    fn unit(&self) -> Unit;

    /// Handle one query.
    async fn dispatch(&self, query: &Query, context: &DispatchContext) -> AgentResult;
}

/// One handler per unit of the closed set.
pub struct DispatchRegistry {
    analytics: Arc<dyn AgentDispatch>,
    knowledge: Arc<dyn AgentDispatch>,
    commerce: Arc<dyn AgentDispatch>,
    triage: Arc<dyn AgentDispatch>,
}

impl DispatchRegistry {
    /// Build a registry. Each handler must serve the unit it is
    /// registered under.
    #[must_use]
    pub fn new(
        analytics: Arc<dyn AgentDispatch>,
        knowledge: Arc<dyn AgentDispatch>,
        commerce: Arc<dyn AgentDispatch>,
        triage: Arc<dyn AgentDispatch>,
    ) -> Self {
        debug_assert_eq!(analytics.unit(), Unit::Analytics);
        debug_assert_eq!(knowledge.unit(), Unit::Knowledge);
        debug_assert_eq!(commerce.unit(), Unit::Commerce);
        debug_assert_eq!(triage.unit(), Unit::Triage);
        Self {
            analytics,
            knowledge,
            commerce,
            triage,
        }
    }

    /// Resolve the handler for a unit.
    #[must_use]
    pub fn for_unit(&self, unit: Unit) -> Arc<dyn AgentDispatch> {
        match unit {
            Unit::Analytics => Arc::clone(&self.analytics),
            Unit::Knowledge => Arc::clone(&self.knowledge),
            Unit::Commerce => Arc::clone(&self.commerce),
            Unit::Triage => Arc::clone(&self.triage),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
