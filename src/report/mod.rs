pub mod html;
pub mod json;
pub mod junit;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::runner::suite::SuiteResult;

pub use types::{ReportMetadata, SuiteReport};

pub struct ReportPaths {
    pub json: PathBuf,
    pub html: PathBuf,
    pub junit: PathBuf,
}

/// Write the full report set for one finished run: timestamped JSON and HTML
/// plus `junit.xml`, with `latest_*` pointers refreshed.
pub fn write_reports(result: &SuiteResult, output_dir: &Path) -> Result<ReportPaths> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let report = SuiteReport::new(result.clone());
    let stamp = report.report_metadata.generated_at.format("%Y%m%d_%H%M%S");

    let json_path = output_dir.join(format!("test_report_{}.json", stamp));
    json::write(&report, &json_path)?;

    let html_path = output_dir.join(format!("test_report_{}.html", stamp));
    std::fs::write(&html_path, html::render(&report))
        .with_context(|| format!("failed to write HTML report to {}", html_path.display()))?;

    let junit_path = junit::write_report(&report, output_dir)?;

    link_latest(&json_path, "latest_test_report.json");
    link_latest(&html_path, "latest_test_report.html");

    Ok(ReportPaths {
        json: json_path,
        html: html_path,
        junit: junit_path,
    })
}

/// Refresh the `latest_*` pointer next to a timestamped report. Best-effort.
#[cfg(unix)]
fn link_latest(target: &Path, link_name: &str) {
    if let (Some(dir), Some(file_name)) = (target.parent(), target.file_name()) {
        let link = dir.join(link_name);
        let _ = std::fs::remove_file(&link);
        if let Err(e) = std::os::unix::fs::symlink(file_name, &link) {
            log::warn!("could not update {}: {}", link.display(), e);
        }
    }
}

#[cfg(not(unix))]
fn link_latest(target: &Path, link_name: &str) {
    if let Some(dir) = target.parent() {
        let link = dir.join(link_name);
        if let Err(e) = std::fs::copy(target, &link) {
            log::warn!("could not update {}: {}", link.display(), e);
        }
    }
}

/// Regenerate a report from a saved JSON result. Accepts both the report
/// envelope and a bare suite result.
pub fn generate_report(results_path: &Path, format: &str, output: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(results_path)
        .with_context(|| format!("failed to read {}", results_path.display()))?;
    let report = parse_results(&raw)
        .with_context(|| format!("{} is not a suite result file", results_path.display()))?;

    let rendered = match format {
        "json" => json::render(&report)?,
        "html" => html::render(&report),
        "junit" => junit::generate_junit_xml(&report)?,
        other => anyhow::bail!("unknown report format: {}", other),
    };

    if let Some(path) = output {
        std::fs::write(path, rendered)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        println!("Report saved to: {}", path.display());
    } else {
        println!("{}", rendered);
    }
    Ok(())
}

fn parse_results(raw: &str) -> Result<SuiteReport> {
    if let Ok(report) = serde_json::from_str::<SuiteReport>(raw) {
        return Ok(report);
    }
    let suite: SuiteResult = serde_json::from_str(raw)?;
    Ok(SuiteReport::new(suite))
}
