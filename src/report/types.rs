use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::runner::suite::SuiteResult;

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub generator: String,
    pub version: String,
    pub format_version: String,
}

impl ReportMetadata {
    pub fn current() -> Self {
        Self {
            generated_at: Utc::now(),
            generator: "cartwright".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            format_version: FORMAT_VERSION.to_string(),
        }
    }
}

/// Envelope written to disk: the sealed suite result plus provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuiteReport {
    pub report_metadata: ReportMetadata,
    pub suite: SuiteResult,
}

impl SuiteReport {
    pub fn new(suite: SuiteResult) -> Self {
        Self {
            report_metadata: ReportMetadata::current(),
            suite,
        }
    }
}
