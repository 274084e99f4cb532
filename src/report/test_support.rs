use chrono::{TimeZone, Utc};
use serde_json::Map;

use crate::driver::BrowserKind;
use crate::retry::FailureEntry;
use crate::runner::scenario::{
    AdvisoryNotes, ScenarioKind, ScenarioPhase, ScenarioResult, ScenarioStatus,
};
use crate::runner::suite::{PerformanceSummary, SlowScenario, SuiteResult};
use crate::steps::{StepOutcome, StepStatus};

use super::types::SuiteReport;

fn step(name: &str, status: StepStatus, artifact: Option<&str>) -> StepOutcome {
    StepOutcome {
        name: name.to_string(),
        display: name.replace('_', " "),
        status,
        duration_ms: Some(120),
        artifact: artifact.map(|a| a.to_string()),
    }
}

/// Two-scenario fixture: a clean product search and a checkout that failed
/// on submit, with an artifact and markup in the error text.
pub fn sample_report() -> SuiteReport {
    let started = Utc.with_ymd_and_hms(2025, 3, 1, 8, 0, 0).unwrap();
    let finished = Utc.with_ymd_and_hms(2025, 3, 1, 8, 1, 30).unwrap();

    let search = ScenarioResult {
        name: "product_search".to_string(),
        kind: ScenarioKind::ProductSearch,
        browser: BrowserKind::Chromium,
        status: ScenarioStatus::Succeeded,
        phase: ScenarioPhase::Completed,
        started_at: started,
        finished_at: finished,
        duration_ms: 1800,
        steps: vec![
            step("navigate", StepStatus::Succeeded, None),
            step("search", StepStatus::Succeeded, None),
        ],
        details: Map::new(),
        advisory: AdvisoryNotes::default(),
        error: None,
    };

    let checkout = ScenarioResult {
        name: "checkout_flow_chromium".to_string(),
        kind: ScenarioKind::CheckoutFlow,
        browser: BrowserKind::Chromium,
        status: ScenarioStatus::Failed,
        phase: ScenarioPhase::Aborted {
            reason: "required step 'submit_order' failed".to_string(),
        },
        started_at: started,
        finished_at: finished,
        duration_ms: 5400,
        steps: vec![
            step("open_product", StepStatus::Succeeded, None),
            step(
                "submit_order",
                StepStatus::Failed {
                    error: "click failed: <button> detached".to_string(),
                },
                Some("reports/screenshots/checkout_flow_chromium_error_1.png"),
            ),
            step(
                "fill_payment_form",
                StepStatus::Skipped {
                    reason: "Previous step failed".to_string(),
                },
                None,
            ),
        ],
        details: Map::new(),
        advisory: AdvisoryNotes::default(),
        error: Some("'checkout_flow_chromium/submit_order' exhausted 3 attempts".to_string()),
    };

    let suite = SuiteResult {
        run_id: "0f2c7d26-0000-4000-8000-000000000001".to_string(),
        suite: "full".to_string(),
        site: "demo-shop".to_string(),
        started_at: started,
        finished_at: finished,
        total: 2,
        passed: 1,
        failed: 1,
        cancelled: false,
        scenarios: vec![search, checkout],
        performance: PerformanceSummary {
            average_duration_ms: 3600.0,
            slowest: vec![
                SlowScenario {
                    name: "checkout_flow_chromium".to_string(),
                    duration_ms: 5400,
                },
                SlowScenario {
                    name: "product_search".to_string(),
                    duration_ms: 1800,
                },
            ],
            failed_scenarios: vec!["checkout_flow_chromium".to_string()],
            insights: Some("Checkout submit dominated the runtime.".to_string()),
        },
        failures: vec![FailureEntry {
            timestamp: finished,
            operation: "checkout_flow_chromium/submit_order".to_string(),
            error: "click failed: <button> detached".to_string(),
            attempts: 3,
        }],
    };

    SuiteReport::new(suite)
}
