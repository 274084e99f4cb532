//! Scenario and suite execution.

pub mod plan;
pub mod scenario;
pub mod suite;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub use plan::{build_suite, render_plan, Flow};
pub use scenario::{Scenario, ScenarioKind, ScenarioResult, ScenarioRunner, ScenarioStatus};
pub use suite::{SuiteDefinition, SuiteOrchestrator, SuiteResult, SuiteSummary};

/// Cooperative cancellation flag, set from the ctrl-c handler. Checked before
/// each scenario and between steps; never mid-step.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
