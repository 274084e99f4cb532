//! Optional LLM advisory channel. Advice is strictly informational: every
//! consumer treats an error here as "no advice" and carries on, so a dead
//! or slow model endpoint can never fail a run.

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::AdvisorConfig;
use crate::error::AdvisoryError;
use crate::runner::scenario::{Scenario, ScenarioResult};
use crate::steps::StepStatus;

#[async_trait]
pub trait AdvisoryProvider: Send + Sync {
    async fn advise(&self, prompt: &str) -> Result<String, AdvisoryError>;
}

/// Stand-in when advisories are turned off.
pub struct NoopAdvisor;

#[async_trait]
impl AdvisoryProvider for NoopAdvisor {
    async fn advise(&self, _prompt: &str) -> Result<String, AdvisoryError> {
        Err(AdvisoryError::Disabled)
    }
}

/// Ollama-style completion endpoint: POST `{apiUrl}/api/generate` with
/// `{model, prompt, stream: false}`, answer in the `response` field.
pub struct LlmAdvisor {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
}

impl LlmAdvisor {
    pub fn new(config: &AdvisorConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: generate_endpoint(&config.api_url),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            timeout: Duration::from_secs(config.timeout_seconds),
        }
    }
}

fn generate_endpoint(api_url: &str) -> String {
    format!("{}/api/generate", api_url.trim_end_matches('/'))
}

#[async_trait]
impl AdvisoryProvider for LlmAdvisor {
    async fn advise(&self, prompt: &str) -> Result<String, AdvisoryError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .json(&json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false,
            }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AdvisoryError::Timeout(self.timeout.as_secs())
            } else {
                AdvisoryError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdvisoryError::Request(format!(
                "{} returned {}",
                self.endpoint, status
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AdvisoryError::Malformed(e.to_string()))?;
        body.get("response")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| AdvisoryError::Malformed("no 'response' field in reply".to_string()))
    }
}

pub fn pre_scenario_prompt(site: &str, scenario: &Scenario) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "You advise an automated storefront test run. Scenario '{}' is about \
         to run against site '{}' on {}.",
        scenario.name, site, scenario.browser
    );
    let _ = writeln!(prompt, "Planned steps:");
    for (index, step) in scenario.steps.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {}", index + 1, step.kind.display());
    }
    let _ = write!(
        prompt,
        "In at most three short bullet points, name what typically breaks in \
         this kind of flow and what to watch for."
    );
    prompt
}

pub fn post_scenario_prompt(site: &str, result: &ScenarioResult) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Scenario '{}' on site '{}' finished with status {} in {} ms.",
        result.name, site, result.status, result.duration_ms
    );
    let _ = writeln!(prompt, "Step results:");
    for step in &result.steps {
        let _ = writeln!(prompt, "- {}: {}", step.name, summarize_step(&step.status));
    }
    if let Some(error) = &result.error {
        let _ = writeln!(prompt, "Scenario error: {}", error);
    }
    let _ = write!(
        prompt,
        "In at most three short bullet points, suggest likely causes or \
         follow-up checks."
    );
    prompt
}

pub fn performance_prompt(site: &str, results: &[ScenarioResult]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "A test suite against site '{}' just finished. Scenario timings:",
        site
    );
    for result in results {
        let _ = writeln!(
            prompt,
            "- {} [{}]: {} ({} ms)",
            result.name, result.browser, result.status, result.duration_ms
        );
    }
    let _ = write!(
        prompt,
        "In at most three short bullet points, flag performance outliers and \
         anything worth investigating."
    );
    prompt
}

fn summarize_step(status: &StepStatus) -> String {
    match status {
        StepStatus::Pending => "pending".to_string(),
        StepStatus::Running => "running".to_string(),
        StepStatus::Succeeded => "succeeded".to_string(),
        StepStatus::Failed { error } => format!("failed ({})", error),
        StepStatus::Skipped { reason } => format!("skipped ({})", reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::BrowserKind;
    use crate::runner::scenario::ScenarioKind;
    use crate::steps::{StepKind, StepSpec};
    use chrono::Utc;

    fn scenario() -> Scenario {
        Scenario {
            name: "product_search".to_string(),
            kind: ScenarioKind::ProductSearch,
            browser: BrowserKind::Chromium,
            steps: vec![
                StepSpec::required(StepKind::Navigate {
                    url: "https://shop.example.com".to_string(),
                }),
                StepSpec::required(StepKind::Search {
                    term: "mug".to_string(),
                }),
            ],
            shipping: None,
            payment: None,
        }
    }

    #[tokio::test]
    async fn test_noop_advisor_reports_disabled() {
        let err = NoopAdvisor.advise("anything").await.unwrap_err();
        assert!(matches!(err, AdvisoryError::Disabled));
    }

    #[test]
    fn test_endpoint_normalizes_trailing_slash() {
        assert_eq!(
            generate_endpoint("http://localhost:11434/"),
            "http://localhost:11434/api/generate"
        );
        assert_eq!(
            generate_endpoint("http://localhost:11434"),
            "http://localhost:11434/api/generate"
        );
    }

    #[test]
    fn test_pre_prompt_names_site_and_steps() {
        let prompt = pre_scenario_prompt("demo-shop", &scenario());
        assert!(prompt.contains("'product_search'"));
        assert!(prompt.contains("'demo-shop'"));
        assert!(prompt.contains("1. Navigate to https://shop.example.com"));
        assert!(prompt.contains("2. Search for \"mug\""));
    }

    #[test]
    fn test_post_prompt_carries_failure_detail() {
        let result =
            ScenarioResult::from_fatal(&scenario(), Utc::now(), "browser crashed".to_string());
        let prompt = post_scenario_prompt("demo-shop", &result);
        assert!(prompt.contains("status failed"));
        assert!(prompt.contains("Scenario error: browser crashed"));
        assert!(prompt.contains("skipped (Session unavailable)"));
    }

    #[test]
    fn test_performance_prompt_lists_every_scenario() {
        let results = vec![
            ScenarioResult::from_fatal(&scenario(), Utc::now(), "x".to_string()),
            ScenarioResult::from_fatal(&scenario(), Utc::now(), "y".to_string()),
        ];
        let prompt = performance_prompt("demo-shop", &results);
        assert_eq!(prompt.matches("- product_search [chromium]").count(), 2);
    }
}
