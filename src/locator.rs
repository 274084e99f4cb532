use std::fmt;
use std::time::Duration;

use anyhow::Result;

use crate::driver::{BrowserDriver, ElementHandle};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;

/// Typed element selector. Drivers translate these into their own query
/// language; steps never hand raw query strings around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Raw CSS selector.
    Css(String),
    /// Element id (`#id`).
    Id(String),
    /// `name` attribute, exact match.
    Name(String),
    /// `name` attribute, substring match.
    NameContains(String),
    /// Visible text, exact match.
    Text(String),
    /// `placeholder` attribute.
    Placeholder(String),
    /// `data-testid` attribute.
    TestId(String),
    /// ARIA role.
    Role(String),
}

impl Selector {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self::Name(name.into())
    }

    pub fn name_contains(fragment: impl Into<String>) -> Self {
        Self::NameContains(fragment.into())
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn placeholder(text: impl Into<String>) -> Self {
        Self::Placeholder(text.into())
    }

    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    pub fn role(role: impl Into<String>) -> Self {
        Self::Role(role.into())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => write!(f, "css={}", s),
            Selector::Id(s) => write!(f, "id={}", s),
            Selector::Name(s) => write!(f, "name={}", s),
            Selector::NameContains(s) => write!(f, "name*={}", s),
            Selector::Text(s) => write!(f, "text={}", s),
            Selector::Placeholder(s) => write!(f, "placeholder={}", s),
            Selector::TestId(s) => write!(f, "testid={}", s),
            Selector::Role(s) => write!(f, "role={}", s),
        }
    }
}

/// Ordered fallback candidates for one logical UI target. Storefronts rarely
/// agree on markup, so every target carries the selector schemes seen in the
/// wild, most specific first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorChain {
    pub target: String,
    pub candidates: Vec<Selector>,
}

impl SelectorChain {
    pub fn new(target: &str, candidates: Vec<Selector>) -> Self {
        Self {
            target: target.to_string(),
            candidates,
        }
    }

    pub fn single(target: &str, candidate: Selector) -> Self {
        Self::new(target, vec![candidate])
    }
}

/// Resolution result. Absence is a value, not an error, so callers decide
/// whether it is fatal for the current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocateOutcome {
    Found {
        handle: ElementHandle,
        /// Index of the winning candidate within the chain.
        candidate: usize,
    },
    NotFound {
        target: String,
        tried: usize,
    },
}

impl LocateOutcome {
    pub fn handle(&self) -> Option<ElementHandle> {
        match self {
            LocateOutcome::Found { handle, .. } => Some(*handle),
            LocateOutcome::NotFound { .. } => None,
        }
    }
}

/// First-match-wins resolution over a selector chain.
///
/// Candidates are tried strictly in list order and each gets an equal share
/// of the configured timeout. No scoring, no per-candidate retry; retrying a
/// whole step is the caller's business.
#[derive(Debug, Clone)]
pub struct ElementLocator {
    timeout: Duration,
}

impl ElementLocator {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn resolve(
        &self,
        driver: &dyn BrowserDriver,
        chain: &SelectorChain,
    ) -> Result<LocateOutcome> {
        if chain.candidates.is_empty() {
            return Ok(LocateOutcome::NotFound {
                target: chain.target.clone(),
                tried: 0,
            });
        }

        let share = (self.timeout / chain.candidates.len() as u32).max(Duration::from_millis(1));

        for (index, candidate) in chain.candidates.iter().enumerate() {
            if let Some(handle) = driver.locate(candidate, share).await? {
                log::debug!(
                    "located '{}' via candidate {} ({})",
                    chain.target,
                    index,
                    candidate
                );
                return Ok(LocateOutcome::Found {
                    handle,
                    candidate: index,
                });
            }
        }

        log::debug!(
            "'{}' not found after {} candidates",
            chain.target,
            chain.candidates.len()
        );
        Ok(LocateOutcome::NotFound {
            target: chain.target.clone(),
            tried: chain.candidates.len(),
        })
    }
}

impl Default for ElementLocator {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }
}
