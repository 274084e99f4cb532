use thiserror::Error;

/// Step-local failures. Converted into outcome data at the step boundary,
/// never propagated past it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StepError {
    /// No candidate selector matched the logical target.
    #[error("no selector matched '{target}' ({tried} candidates tried)")]
    LocatorNotFound { target: String, tried: usize },

    /// The element was there but the interaction primitive errored.
    #[error("{action} failed: {reason}")]
    Interaction { action: String, reason: String },
}

impl StepError {
    pub fn interaction(action: &str, reason: impl ToString) -> Self {
        Self::Interaction {
            action: action.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Terminal retry failure carrying the last underlying error.
#[derive(Debug, Error)]
#[error("'{operation}' exhausted {attempts} attempts: {source}")]
pub struct RetryExhausted<E>
where
    E: std::error::Error + 'static,
{
    pub operation: String,
    pub attempts: u32,
    #[source]
    pub source: E,
}

/// Scenario-fatal failures. Caught by the suite orchestrator and converted
/// into a failed scenario result; the suite keeps going.
#[derive(Debug, Error)]
pub enum ScenarioFatal {
    #[error("failed to open {browser} session: {reason}")]
    SessionAcquisition { browser: String, reason: String },
}

/// Advisory provider failures. Call sites treat these as "no advisory text",
/// never as a scenario failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdvisoryError {
    #[error("advisor is disabled")]
    Disabled,
    #[error("advisor request failed: {0}")]
    Request(String),
    #[error("advisor timed out after {0}s")]
    Timeout(u64),
    #[error("advisor response malformed: {0}")]
    Malformed(String),
}

/// Configuration problems detected before any scenario starts. The only
/// errors allowed to escape a suite run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {reason}")]
    Unreadable { path: String, reason: String },
    #[error("failed to parse config '{path}': {reason}")]
    Unparsable { path: String, reason: String },
    #[error("unknown site '{0}' (not listed under testing.targetSites)")]
    UnknownSite(String),
    #[error("maxRetries must be at least 1, got {0}")]
    InvalidMaxRetries(u32),
    #[error("backoffBaseSeconds must be non-negative, got {0}")]
    InvalidBackoffBase(f64),
    #[error("no browsers configured")]
    NoBrowsers,
    #[error("unknown browser '{0}' (expected chromium, firefox or webkit)")]
    UnknownBrowser(String),
    #[error("site '{site}' has no {field} configured (required for the {flow} flow)")]
    MissingSiteField {
        site: String,
        field: &'static str,
        flow: String,
    },
    #[error("suite '{0}' has no scenarios")]
    EmptySuite(String),
}
