//! # ferry-agents
//!
//! The four processing units behind Ferry's [`AgentDispatch`] interface.
//!
//! Unit internals are deliberately shallow — SQL execution, vector
//! retrieval, and document extraction belong to external systems. What
//! lives here is enough for the pipeline to run end to end:
//!
//! - [`TriageUnit`] — fully local and deterministic (it must work when
//!   the gateway does not)
//! - [`AnalyticsUnit`], [`KnowledgeUnit`], [`CommerceUnit`] — thin
//!   gateway-backed handlers that report failure as tagged results
//!
//! [`AgentDispatch`]: ferry_runtime::AgentDispatch

#![deny(unsafe_code)]

pub mod analytics;
pub mod commerce;
pub mod knowledge;
pub mod triage;
mod util;

pub use analytics::AnalyticsUnit;
pub use commerce::CommerceUnit;
pub use knowledge::KnowledgeUnit;
pub use triage::TriageUnit;

use std::sync::Arc;

use ferry_gateway::Gateway;
use ferry_runtime::DispatchRegistry;

/// Build the standard registry: one handler per unit over a shared
/// gateway.
#[must_use]
pub fn standard_registry(gateway: Arc<dyn Gateway>) -> DispatchRegistry {
    DispatchRegistry::new(
        Arc::new(AnalyticsUnit::new(Arc::clone(&gateway))),
        Arc::new(KnowledgeUnit::new(Arc::clone(&gateway))),
        Arc::new(CommerceUnit::new(gateway)),
        Arc::new(TriageUnit::new()),
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ferry_core::unit::Unit;
    use ferry_gateway::MockGateway;

    #[test]
    fn standard_registry_covers_all_units() {
        let registry = standard_registry(Arc::new(MockGateway::new(8)));
        for unit in Unit::ALL {
            assert_eq!(registry.for_unit(unit).unit(), unit);
        }
    }
}
