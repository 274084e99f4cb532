//! JSON configuration, camelCase keys throughout. Every field has a default
//! so a missing file still yields a runnable config; secrets can come from
//! the environment instead of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::BrowserKind;
use crate::error::ConfigError;
use crate::locator::DEFAULT_TIMEOUT_MS;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub testing: TestingConfig,
    pub advisor: AdvisorConfig,
    pub notifications: NotificationsConfig,
    pub reporting: ReportingConfig,
    pub data: DataConfig,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut config: Config =
            serde_json::from_str(&raw).map_err(|e| ConfigError::Unparsable {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// A missing file falls back to defaults; an unreadable or malformed one
    /// is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            log::warn!("config {} not found, using defaults", path.display());
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var("CARTWRIGHT_ADVISOR_API_KEY") {
            if !key.is_empty() {
                self.advisor.api_key = Some(key);
            }
        }
        if let Ok(token) = std::env::var("CARTWRIGHT_TELEGRAM_TOKEN") {
            if !token.is_empty() {
                self.notifications.telegram.bot_token = token;
            }
        }
        if let Ok(secret) = std::env::var("CARTWRIGHT_LARK_SECRET") {
            if !secret.is_empty() {
                self.notifications.lark.secret = secret;
            }
        }
    }

    /// Pre-flight checks, run before any scenario starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.testing.max_retries < 1 {
            return Err(ConfigError::InvalidMaxRetries(self.testing.max_retries));
        }
        if self.testing.backoff_base_seconds < 0.0 {
            return Err(ConfigError::InvalidBackoffBase(
                self.testing.backoff_base_seconds,
            ));
        }
        if self.testing.browsers.is_empty() {
            return Err(ConfigError::NoBrowsers);
        }
        Ok(())
    }

    /// Look up a target site by name, with URL variables expanded.
    pub fn site(&self, name: &str) -> Result<SiteConfig, ConfigError> {
        self.testing
            .target_sites
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.expanded())
            .ok_or_else(|| ConfigError::UnknownSite(name.to_string()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestingConfig {
    pub max_retries: u32,
    pub backoff_base_seconds: f64,
    pub per_selector_timeout_ms: u64,
    pub headless: bool,
    pub browsers: Vec<BrowserKind>,
    pub screenshot_on_failure: bool,
    /// Checkout scenarios stop short of placing an order unless this is on.
    pub submit_orders: bool,
    /// Settle delay after navigation and clicks, in milliseconds.
    pub settle_ms: u64,
    pub target_sites: Vec<SiteConfig>,
}

impl Default for TestingConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base_seconds: 1.0,
            per_selector_timeout_ms: DEFAULT_TIMEOUT_MS,
            headless: true,
            browsers: vec![BrowserKind::Chromium],
            screenshot_on_failure: true,
            submit_orders: false,
            settle_ms: 500,
            target_sites: Vec::new(),
        }
    }
}

impl TestingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::from_secs_f64(self.backoff_base_seconds.max(0.0)),
        )
    }

    pub fn locator_timeout(&self) -> Duration {
        Duration::from_millis(self.per_selector_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub checkout_url: String,
    #[serde(default)]
    pub product_urls: Vec<String>,
    #[serde(default)]
    pub search_terms: Vec<String>,
}

impl SiteConfig {
    /// Resolve `${...}` references in the URL fields against the site itself.
    /// Unknown keys are left in place.
    pub fn expanded(&self) -> SiteConfig {
        let mut site = self.clone();
        site.checkout_url = self.expand(&self.checkout_url);
        site.product_urls = self.product_urls.iter().map(|u| self.expand(u)).collect();
        site
    }

    fn expand(&self, text: &str) -> String {
        let re = Regex::new(r"\$\{([a-zA-Z0-9_.]+)\}").unwrap();
        re.replace_all(text, |caps: &regex::Captures| match &caps[1] {
            "baseUrl" => self.base_url.clone(),
            "name" => self.name.clone(),
            other => format!("${{{}}}", other),
        })
        .to_string()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvisorConfig {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "http://localhost:11434".to_string(),
            api_key: None,
            model: "dolphin-mistral".to_string(),
            timeout_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationsConfig {
    pub telegram: TelegramConfig,
    pub lark: LarkConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LarkConfig {
    pub enabled: bool,
    pub webhook_url: String,
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportingConfig {
    pub output_dir: PathBuf,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl ReportingConfig {
    pub fn screenshots_dir(&self) -> PathBuf {
        self.output_dir.join("screenshots")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConfig {
    pub addresses_csv: Option<PathBuf>,
    pub address_count: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            addresses_csv: None,
            address_count: 3,
        }
    }
}
