use std::path::Path;

use anyhow::{Context, Result};

use super::types::SuiteReport;

pub fn render(report: &SuiteReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize suite report")
}

pub fn write(report: &SuiteReport, path: &Path) -> Result<()> {
    std::fs::write(path, render(report)?)
        .with_context(|| format!("failed to write JSON report to {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::sample_report;

    #[test]
    fn test_render_is_pretty_printed_and_complete() {
        let report = sample_report();
        let json = render(&report).unwrap();

        // Pretty output spans lines and keeps camelCase keys
        assert!(json.lines().count() > 10);
        assert!(json.contains("\"reportMetadata\""));
        assert!(json.contains("\"runId\""));
        assert!(json.contains("\"product_search\""));

        let parsed: SuiteReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.suite.total, report.suite.total);
    }
}
