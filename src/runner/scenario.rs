use std::fmt;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::driver::{BrowserDriver, BrowserKind, SessionFactory};
use crate::error::ScenarioFatal;
use crate::events::{EventEmitter, TestEvent};
use crate::locator::ElementLocator;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::steps::{StepOutcome, StepRun, StepSession, StepSpec, StepStatus};

use super::CancelFlag;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    ProductSearch,
    CartManagement,
    FormValidation,
    CheckoutFlow,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScenarioKind::ProductSearch => "product_search",
            ScenarioKind::CartManagement => "cart_management",
            ScenarioKind::FormValidation => "form_validation",
            ScenarioKind::CheckoutFlow => "checkout_flow",
        };
        f.write_str(name)
    }
}

/// One runnable scenario: an ordered step list plus the test data the steps
/// draw from. Built by the suite planner, immutable afterwards.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub kind: ScenarioKind,
    pub browser: BrowserKind,
    pub steps: Vec<StepSpec>,
    pub shipping: Option<crate::data::Address>,
    pub payment: Option<crate::data::PaymentCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScenarioPhase {
    Pending,
    Running,
    Completed,
    Aborted { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Succeeded,
    Failed,
}

impl ScenarioStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScenarioStatus::Succeeded => "succeeded",
            ScenarioStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Live state for a single step. Collapsed into a [`StepOutcome`] when the
/// scenario finishes.
#[derive(Debug, Clone)]
struct StepState {
    spec: StepSpec,
    status: StepStatus,
    started_at: Option<Instant>,
    duration_ms: Option<u64>,
    artifact: Option<String>,
}

impl StepState {
    fn new(spec: StepSpec) -> Self {
        Self {
            spec,
            status: StepStatus::Pending,
            started_at: None,
            duration_ms: None,
            artifact: None,
        }
    }

    fn start(&mut self) {
        self.status = StepStatus::Running;
        self.started_at = Some(Instant::now());
    }

    fn succeed(&mut self) {
        self.finish(StepStatus::Succeeded);
    }

    fn fail(&mut self, error: String) {
        self.finish(StepStatus::Failed { error });
    }

    fn skip(&mut self, reason: String) {
        self.finish(StepStatus::Skipped { reason });
    }

    fn finish(&mut self, status: StepStatus) {
        self.status = status;
        if let Some(start) = self.started_at {
            self.duration_ms = Some(start.elapsed().as_millis() as u64);
        }
    }

    fn to_outcome(&self) -> StepOutcome {
        StepOutcome {
            name: self.spec.kind.name().to_string(),
            display: self.spec.kind.display(),
            status: self.status.clone(),
            duration_ms: self.duration_ms,
            artifact: self.artifact.clone(),
        }
    }
}

fn skip_remaining(states: &mut [StepState], reason: &str) {
    for state in states {
        if matches!(state.status, StepStatus::Pending) {
            state.skip(reason.to_string());
        }
    }
}

/// Advisory text attached around a scenario run. Both halves optional; an
/// unavailable advisor leaves them empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryNotes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<String>,
}

impl AdvisoryNotes {
    pub fn is_empty(&self) -> bool {
        self.pre.is_none() && self.post.is_none()
    }
}

/// Immutable record of one scenario run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioResult {
    pub name: String,
    pub kind: ScenarioKind,
    pub browser: BrowserKind,
    pub status: ScenarioStatus,
    pub phase: ScenarioPhase,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepOutcome>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
    #[serde(default, skip_serializing_if = "AdvisoryNotes::is_empty")]
    pub advisory: AdvisoryNotes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScenarioResult {
    /// Result for a scenario whose session never opened. Steps are recorded
    /// as skipped so the outcome list stays complete.
    pub fn from_fatal(scenario: &Scenario, started_at: DateTime<Utc>, error: String) -> Self {
        let finished_at = Utc::now();
        Self {
            name: scenario.name.clone(),
            kind: scenario.kind,
            browser: scenario.browser,
            status: ScenarioStatus::Failed,
            phase: ScenarioPhase::Aborted {
                reason: "session acquisition failed".to_string(),
            },
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            steps: scenario
                .steps
                .iter()
                .map(|spec| StepOutcome {
                    name: spec.kind.name().to_string(),
                    display: spec.kind.display(),
                    status: StepStatus::Skipped {
                        reason: "Session unavailable".to_string(),
                    },
                    duration_ms: None,
                    artifact: None,
                })
                .collect(),
            details: Map::new(),
            advisory: AdvisoryNotes::default(),
            error: Some(error),
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == ScenarioStatus::Succeeded
    }
}

/// Drives one scenario through `Pending → Running → {Completed, Aborted}`
/// against a fresh browser session.
///
/// The session is owned exclusively by this run and released exactly once on
/// every exit path. Step failures stay inside the returned result; only a
/// failed session acquisition is fatal.
pub struct ScenarioRunner {
    locator: ElementLocator,
    retry: RetryExecutor,
    policy: RetryPolicy,
    screenshots_dir: PathBuf,
    screenshot_on_failure: bool,
    emitter: EventEmitter,
    cancel: CancelFlag,
}

impl ScenarioRunner {
    pub fn new(
        locator: ElementLocator,
        retry: RetryExecutor,
        policy: RetryPolicy,
        screenshots_dir: PathBuf,
        screenshot_on_failure: bool,
        emitter: EventEmitter,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            locator,
            retry,
            policy,
            screenshots_dir,
            screenshot_on_failure,
            emitter,
            cancel,
        }
    }

    pub async fn run(
        &self,
        factory: &dyn SessionFactory,
        scenario: &Scenario,
    ) -> Result<ScenarioResult, ScenarioFatal> {
        let started_at = Utc::now();

        let driver = factory.open(scenario.browser).await.map_err(|e| {
            ScenarioFatal::SessionAcquisition {
                browser: scenario.browser.to_string(),
                reason: format!("{:#}", e),
            }
        })?;

        let mut states: Vec<StepState> = scenario
            .steps
            .iter()
            .map(|spec| StepState::new(spec.clone()))
            .collect();
        let mut phase = ScenarioPhase::Running;

        let session = StepSession::new(
            driver.as_ref(),
            &self.locator,
            scenario.shipping.as_ref(),
            scenario.payment.as_ref(),
        );

        for index in 0..states.len() {
            if self.cancel.is_cancelled() {
                skip_remaining(&mut states[index..], "Cancelled");
                phase = ScenarioPhase::Aborted {
                    reason: "cancelled".to_string(),
                };
                self.emitter.emit(TestEvent::Log {
                    message: "cancellation requested, skipping remaining steps".to_string(),
                });
                break;
            }

            let spec = states[index].spec.clone();
            states[index].start();
            self.emitter.emit(TestEvent::StepStarted {
                scenario: scenario.name.clone(),
                index,
                display: spec.kind.display(),
            });

            if spec.required {
                let operation = format!("{}/{}", scenario.name, spec.kind.name());
                let attempt = self
                    .retry
                    .execute(&operation, &self.policy, || session.run(&spec.kind))
                    .await;
                match attempt {
                    Ok(StepRun::Completed) => {
                        states[index].succeed();
                        self.emit_passed(&scenario.name, index, &states[index]);
                    }
                    Ok(StepRun::Skipped { reason }) => {
                        states[index].skip(reason.clone());
                        self.emit_skipped(&scenario.name, index, reason);
                    }
                    Err(exhausted) => {
                        let error = exhausted.to_string();
                        states[index].artifact = self
                            .capture_failure_artifact(driver.as_ref(), &scenario.name)
                            .await;
                        states[index].fail(error.clone());
                        self.emitter.emit(TestEvent::StepFailed {
                            scenario: scenario.name.clone(),
                            index,
                            error,
                            duration_ms: states[index].duration_ms.unwrap_or(0),
                        });

                        skip_remaining(&mut states[index + 1..], "Previous step failed");
                        phase = ScenarioPhase::Aborted {
                            reason: format!("required step '{}' failed", spec.kind.name()),
                        };
                        break;
                    }
                }
            } else {
                match session.run(&spec.kind).await {
                    Ok(StepRun::Completed) => {
                        states[index].succeed();
                        self.emit_passed(&scenario.name, index, &states[index]);
                    }
                    Ok(StepRun::Skipped { reason }) => {
                        states[index].skip(reason.clone());
                        self.emit_skipped(&scenario.name, index, reason);
                    }
                    Err(err) => {
                        // Best-effort steps downgrade failures to skips
                        let reason = err.to_string();
                        states[index].skip(reason.clone());
                        self.emit_skipped(&scenario.name, index, reason);
                    }
                }
            }
        }

        if phase == ScenarioPhase::Running {
            phase = ScenarioPhase::Completed;
        }

        let details = session.into_details();

        // Single release point for the session, reached on every path
        if let Err(e) = driver.close().await {
            log::warn!("failed to close browser session: {:#}", e);
        }

        let status = if states
            .iter()
            .all(|s| matches!(s.status, StepStatus::Succeeded))
        {
            ScenarioStatus::Succeeded
        } else {
            ScenarioStatus::Failed
        };

        let finished_at = Utc::now();
        Ok(ScenarioResult {
            name: scenario.name.clone(),
            kind: scenario.kind,
            browser: scenario.browser,
            status,
            phase,
            started_at,
            finished_at,
            duration_ms: (finished_at - started_at).num_milliseconds().max(0) as u64,
            steps: states.iter().map(|s| s.to_outcome()).collect(),
            details,
            advisory: AdvisoryNotes::default(),
            error: None,
        })
    }

    fn emit_passed(&self, scenario: &str, index: usize, state: &StepState) {
        self.emitter.emit(TestEvent::StepPassed {
            scenario: scenario.to_string(),
            index,
            duration_ms: state.duration_ms.unwrap_or(0),
        });
    }

    fn emit_skipped(&self, scenario: &str, index: usize, reason: String) {
        self.emitter.emit(TestEvent::StepSkipped {
            scenario: scenario.to_string(),
            index,
            reason,
        });
    }

    async fn capture_failure_artifact(
        &self,
        driver: &dyn BrowserDriver,
        scenario: &str,
    ) -> Option<String> {
        if !self.screenshot_on_failure {
            return None;
        }
        let filename = format!("{}_error_{}.png", slug(scenario), Utc::now().timestamp());
        let path = self.screenshots_dir.join(filename);
        match driver.capture_screenshot(&path).await {
            Ok(()) => Some(path.display().to_string()),
            Err(e) => {
                log::warn!("failed to capture failure screenshot: {:#}", e);
                None
            }
        }
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::driver::fake::{FakeDriver, FakeSessionFactory};
    use crate::locator::Selector;
    use crate::steps::StepKind;

    fn runner(screenshot_on_failure: bool) -> ScenarioRunner {
        ScenarioRunner::new(
            ElementLocator::new(Duration::from_millis(50)),
            RetryExecutor::default(),
            RetryPolicy::new(2, Duration::from_millis(1)),
            std::env::temp_dir().join("cartwright-test-shots"),
            screenshot_on_failure,
            EventEmitter::default(),
            CancelFlag::new(),
        )
    }

    fn cart_scenario(steps: Vec<StepSpec>) -> Scenario {
        Scenario {
            name: "cart_management".to_string(),
            kind: ScenarioKind::CartManagement,
            browser: BrowserKind::Chromium,
            steps,
            shipping: None,
            payment: None,
        }
    }

    fn searchable_driver() -> FakeDriver {
        let driver = FakeDriver::new();
        driver.script_element(&Selector::css(r#"input[name="search"]"#), 1);
        driver.script_count(&Selector::css(".product-item"), 4);
        driver
    }

    #[tokio::test]
    async fn test_green_run_completes_and_releases_session_once() {
        let driver = searchable_driver();
        let factory = FakeSessionFactory::new();
        factory.enqueue_session(driver.clone());

        let scenario = Scenario {
            name: "product_search".to_string(),
            kind: ScenarioKind::ProductSearch,
            browser: BrowserKind::Chromium,
            steps: vec![
                StepSpec::required(StepKind::Navigate {
                    url: "https://shop.example.com".to_string(),
                }),
                StepSpec::required(StepKind::Search {
                    term: "sneakers".to_string(),
                }),
            ],
            shipping: None,
            payment: None,
        };

        let result = runner(true).run(&factory, &scenario).await.unwrap();

        assert_eq!(result.status, ScenarioStatus::Succeeded);
        assert_eq!(result.phase, ScenarioPhase::Completed);
        assert!(result
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Succeeded));
        assert_eq!(result.details["resultCount"], serde_json::json!(4));
        assert_eq!(driver.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_required_failure_aborts_skips_rest_and_captures_one_artifact() {
        let driver = FakeDriver::new();
        let factory = FakeSessionFactory::new();
        factory.enqueue_session(driver.clone());

        // Navigate succeeds, add-to-cart has no matching element, open-cart
        // must never run.
        let scenario = cart_scenario(vec![
            StepSpec::required(StepKind::Navigate {
                url: "https://shop.example.com/p/1".to_string(),
            }),
            StepSpec::required(StepKind::AddToCart),
            StepSpec::required(StepKind::OpenCart),
        ]);

        let runner = runner(true);
        let result = runner.run(&factory, &scenario).await.unwrap();

        assert_eq!(result.status, ScenarioStatus::Failed);
        assert_eq!(
            result.phase,
            ScenarioPhase::Aborted {
                reason: "required step 'add_to_cart' failed".to_string()
            }
        );

        assert_eq!(result.steps[0].status, StepStatus::Succeeded);
        match &result.steps[1].status {
            StepStatus::Failed { error } => {
                assert!(error.contains("exhausted 2 attempts"), "{}", error);
                assert!(error.contains("add to cart button"), "{}", error);
            }
            other => panic!("expected failed step, got {:?}", other),
        }
        assert_eq!(
            result.steps[2].status,
            StepStatus::Skipped {
                reason: "Previous step failed".to_string()
            }
        );

        let artifacts: Vec<_> = result
            .steps
            .iter()
            .filter_map(|s| s.artifact.as_ref())
            .collect();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(driver.screenshots().len(), 1);
        assert_eq!(driver.close_calls(), 1);

        assert_eq!(runner.retry.exhausted_count(), 1);
        let entries = runner.retry.failure_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].operation, "cart_management/add_to_cart");
        assert_eq!(entries[0].attempts, 2);
    }

    #[tokio::test]
    async fn test_best_effort_failure_downgrades_to_skipped() {
        let driver = FakeDriver::new();
        let factory = FakeSessionFactory::new();
        factory.enqueue_session(driver.clone());

        let scenario = cart_scenario(vec![
            StepSpec::required(StepKind::Navigate {
                url: "https://shop.example.com/cart".to_string(),
            }),
            StepSpec::best_effort(StepKind::SetQuantity { quantity: 2 }),
        ]);

        let result = runner(true).run(&factory, &scenario).await.unwrap();

        assert_eq!(result.phase, ScenarioPhase::Completed);
        match &result.steps[1].status {
            StepStatus::Skipped { reason } => {
                assert!(reason.contains("quantity input"), "{}", reason)
            }
            other => panic!("expected skipped step, got {:?}", other),
        }
        // Any skip still fails the scenario
        assert_eq!(result.status, ScenarioStatus::Failed);
        assert!(driver.screenshots().is_empty());
        assert_eq!(driver.close_calls(), 1);
    }

    #[tokio::test]
    async fn test_screenshot_gating_respects_config() {
        let driver = FakeDriver::new();
        let factory = FakeSessionFactory::new();
        factory.enqueue_session(driver.clone());

        let scenario = cart_scenario(vec![StepSpec::required(StepKind::AddToCart)]);
        let result = runner(false).run(&factory, &scenario).await.unwrap();

        assert_eq!(result.status, ScenarioStatus::Failed);
        assert!(result.steps[0].artifact.is_none());
        assert!(driver.screenshots().is_empty());
    }

    #[tokio::test]
    async fn test_session_refusal_is_fatal() {
        let factory = FakeSessionFactory::new();
        factory.enqueue_refusal("browser crashed on startup");

        let scenario = cart_scenario(vec![StepSpec::required(StepKind::OpenCart)]);
        let err = runner(true).run(&factory, &scenario).await.unwrap_err();

        match err {
            ScenarioFatal::SessionAcquisition { browser, reason } => {
                assert_eq!(browser, "chromium");
                assert!(reason.contains("browser crashed"), "{}", reason);
            }
        }
    }

    #[tokio::test]
    async fn test_cancellation_skips_all_steps_and_releases_session() {
        let driver = searchable_driver();
        let factory = FakeSessionFactory::new();
        factory.enqueue_session(driver.clone());

        let cancel = CancelFlag::new();
        cancel.cancel();
        let runner = ScenarioRunner::new(
            ElementLocator::new(Duration::from_millis(50)),
            RetryExecutor::default(),
            RetryPolicy::default(),
            std::env::temp_dir(),
            true,
            EventEmitter::default(),
            cancel,
        );

        let scenario = cart_scenario(vec![
            StepSpec::required(StepKind::Navigate {
                url: "https://shop.example.com".to_string(),
            }),
            StepSpec::required(StepKind::OpenCart),
        ]);
        let result = runner.run(&factory, &scenario).await.unwrap();

        assert_eq!(
            result.phase,
            ScenarioPhase::Aborted {
                reason: "cancelled".to_string()
            }
        );
        assert!(result
            .steps
            .iter()
            .all(|s| s.status == StepStatus::Skipped { reason: "Cancelled".to_string() }));
        assert!(driver.actions().is_empty());
        assert_eq!(driver.close_calls(), 1);
    }

    #[test]
    fn test_fatal_result_marks_steps_skipped() {
        let scenario = cart_scenario(vec![
            StepSpec::required(StepKind::OpenCart),
            StepSpec::required(StepKind::RemoveItem),
        ]);
        let result =
            ScenarioResult::from_fatal(&scenario, Utc::now(), "no session".to_string());

        assert_eq!(result.status, ScenarioStatus::Failed);
        assert_eq!(result.steps.len(), 2);
        assert!(result
            .steps
            .iter()
            .all(|s| matches!(s.status, StepStatus::Skipped { .. })));
        assert_eq!(result.error.as_deref(), Some("no session"));
    }
}
