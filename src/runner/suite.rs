use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::advisor::{self, AdvisoryProvider};
use crate::driver::SessionFactory;
use crate::error::{AdvisoryError, ConfigError};
use crate::events::{EventEmitter, TestEvent};
use crate::retry::{FailureEntry, RetryExecutor};

use super::scenario::{Scenario, ScenarioResult, ScenarioRunner};
use super::CancelFlag;

/// An ordered list of scenarios against one site. Built by the planner.
#[derive(Debug, Clone)]
pub struct SuiteDefinition {
    pub name: String,
    pub site: String,
    pub scenarios: Vec<Scenario>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowScenario {
    pub name: String,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSummary {
    pub average_duration_ms: f64,
    /// Top three by duration, descending. Ties keep execution order.
    pub slowest: Vec<SlowScenario>,
    /// Failed scenario names in execution order.
    pub failed_scenarios: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<String>,
}

/// Counter block shared with events and notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteSummary {
    pub run_id: String,
    pub suite: String,
    pub site: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_ms: u64,
}

/// Complete, immutable record of one suite run. Reporting and notification
/// sinks consume this and never mutate it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteResult {
    pub run_id: String,
    pub suite: String,
    pub site: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub cancelled: bool,
    pub scenarios: Vec<ScenarioResult>,
    pub performance: PerformanceSummary,
    /// Entries from the per-run retry failure log, exhaustions only.
    pub failures: Vec<FailureEntry>,
}

impl SuiteResult {
    pub fn summary(&self) -> SuiteSummary {
        SuiteSummary {
            run_id: self.run_id.clone(),
            suite: self.suite.clone(),
            site: self.site.clone(),
            total: self.total,
            passed: self.passed,
            failed: self.failed,
            total_duration_ms: (self.finished_at - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.passed as f64 / self.total as f64 * 100.0
    }
}

/// Runs scenarios strictly in order and aggregates their results.
///
/// Counters and the failure log live on this run; nothing is process-global.
/// A scenario-fatal error becomes a failed result and the suite moves on;
/// only pre-flight validation can make `run` itself fail.
pub struct SuiteOrchestrator {
    factory: Arc<dyn SessionFactory>,
    advisor: Arc<dyn AdvisoryProvider>,
    runner: ScenarioRunner,
    retry: RetryExecutor,
    emitter: EventEmitter,
    cancel: CancelFlag,
}

impl SuiteOrchestrator {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        advisor: Arc<dyn AdvisoryProvider>,
        runner: ScenarioRunner,
        retry: RetryExecutor,
        emitter: EventEmitter,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            factory,
            advisor,
            runner,
            retry,
            emitter,
            cancel,
        }
    }

    pub async fn run(&self, suite: &SuiteDefinition) -> Result<SuiteResult, ConfigError> {
        if suite.scenarios.is_empty() {
            return Err(ConfigError::EmptySuite(suite.name.clone()));
        }

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        self.emitter.emit(TestEvent::SuiteStarted {
            run_id: run_id.clone(),
            suite: suite.name.clone(),
            site: suite.site.clone(),
            scenario_count: suite.scenarios.len(),
        });

        let mut results: Vec<ScenarioResult> = Vec::with_capacity(suite.scenarios.len());
        let mut passed = 0usize;
        let mut failed = 0usize;
        let mut cancelled = false;

        for (index, scenario) in suite.scenarios.iter().enumerate() {
            if self.cancel.is_cancelled() {
                cancelled = true;
                log::info!(
                    "cancellation requested, stopping before '{}'",
                    scenario.name
                );
                break;
            }

            self.emitter.emit(TestEvent::ScenarioStarted {
                name: scenario.name.clone(),
                browser: scenario.browser.to_string(),
                index,
                total: suite.scenarios.len(),
                step_count: scenario.steps.len(),
            });

            let pre = self
                .advise(
                    &scenario.name,
                    "pre",
                    advisor::pre_scenario_prompt(&suite.site, scenario),
                )
                .await;

            let scenario_started = Utc::now();
            let mut result = match self.runner.run(self.factory.as_ref(), scenario).await {
                Ok(result) => result,
                Err(fatal) => {
                    log::error!("scenario '{}' failed fatally: {}", scenario.name, fatal);
                    ScenarioResult::from_fatal(scenario, scenario_started, fatal.to_string())
                }
            };

            result.advisory.pre = pre;
            result.advisory.post = self
                .advise(
                    &scenario.name,
                    "post",
                    advisor::post_scenario_prompt(&suite.site, &result),
                )
                .await;

            if result.succeeded() {
                passed += 1;
            } else {
                failed += 1;
            }

            self.emitter.emit(TestEvent::ScenarioFinished {
                name: result.name.clone(),
                status: result.status,
                duration_ms: Some(result.duration_ms),
            });
            results.push(result);
        }

        let insights = if results.is_empty() {
            None
        } else {
            self.advise(
                &suite.name,
                "performance",
                advisor::performance_prompt(&suite.site, &results),
            )
            .await
        };

        let finished_at = Utc::now();
        let result = SuiteResult {
            run_id,
            suite: suite.name.clone(),
            site: suite.site.clone(),
            started_at,
            finished_at,
            total: results.len(),
            passed,
            failed,
            cancelled,
            performance: performance_summary(&results, insights),
            scenarios: results,
            failures: self.retry.failure_entries(),
        };

        self.emitter.emit(TestEvent::SuiteFinished {
            summary: result.summary(),
        });
        Ok(result)
    }

    /// Best-effort advisory call. Whatever goes wrong, scenarios proceed.
    async fn advise(&self, scenario: &str, stage: &str, prompt: String) -> Option<String> {
        match self.advisor.advise(&prompt).await {
            Ok(text) if !text.trim().is_empty() => {
                self.emitter.emit(TestEvent::Advisory {
                    scenario: scenario.to_string(),
                    stage: stage.to_string(),
                    text: text.clone(),
                });
                Some(text)
            }
            Ok(_) => None,
            Err(AdvisoryError::Disabled) => None,
            Err(err) => {
                log::warn!("advisory ({}) unavailable: {}", stage, err);
                None
            }
        }
    }
}

fn performance_summary(
    results: &[ScenarioResult],
    insights: Option<String>,
) -> PerformanceSummary {
    let average_duration_ms = if results.is_empty() {
        0.0
    } else {
        results.iter().map(|r| r.duration_ms as f64).sum::<f64>() / results.len() as f64
    };

    let mut slowest: Vec<SlowScenario> = results
        .iter()
        .map(|r| SlowScenario {
            name: r.name.clone(),
            duration_ms: r.duration_ms,
        })
        .collect();
    // Stable sort keeps execution order for equal durations
    slowest.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
    slowest.truncate(3);

    let failed_scenarios = results
        .iter()
        .filter(|r| !r.succeeded())
        .map(|r| r.name.clone())
        .collect();

    PerformanceSummary {
        average_duration_ms,
        slowest,
        failed_scenarios,
        insights,
    }
}
