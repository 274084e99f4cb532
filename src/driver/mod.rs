pub mod traits;
pub mod web;

#[cfg(test)]
pub mod fake;

pub use traits::{BrowserDriver, ElementHandle, SessionFactory};
pub use web::{PlaywrightSessionFactory, WebSessionConfig};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Browser variants a scenario can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[serde(alias = "chrome")]
    Chromium,
    Firefox,
    #[serde(alias = "safari")]
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BrowserKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "chromium" | "chrome" => Ok(BrowserKind::Chromium),
            "firefox" => Ok(BrowserKind::Firefox),
            "webkit" | "safari" => Ok(BrowserKind::Webkit),
            other => Err(ConfigError::UnknownBrowser(other.to_string())),
        }
    }
}

impl Default for BrowserKind {
    fn default() -> Self {
        BrowserKind::Chromium
    }
}
