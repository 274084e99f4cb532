use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::types::SuiteReport;
use crate::runner::scenario::ScenarioResult;
use crate::steps::StepStatus;

/// One `<testsuite>` per scenario, one `<testcase>` per step.
pub fn generate_junit_xml(report: &SuiteReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let suite = &report.suite;
    let total_tests: usize = suite.scenarios.iter().map(|s| s.steps.len()).sum();
    let total_failures: usize = suite.scenarios.iter().map(failed_steps).sum();
    let total_skipped: usize = suite.scenarios.iter().map(skipped_steps).sum();
    let total_time = suite.summary().total_duration_ms as f64 / 1000.0;

    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "cartwright-run"));
    suites_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suites_start.push_attribute(("failures", total_failures.to_string().as_str()));
    suites_start.push_attribute(("skipped", total_skipped.to_string().as_str()));
    suites_start.push_attribute(("time", total_time.to_string().as_str()));
    writer.write_event(Event::Start(suites_start))?;

    for scenario in &suite.scenarios {
        write_scenario_suite(&mut writer, &suite.site, scenario)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_scenario_suite<W: std::io::Write>(
    writer: &mut Writer<W>,
    site: &str,
    scenario: &ScenarioResult,
) -> Result<()> {
    let time = (scenario.duration_ms as f64 / 1000.0).to_string();
    let timestamp = scenario.started_at.to_rfc3339();

    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", scenario.name.as_str()));
    suite_start.push_attribute(("tests", scenario.steps.len().to_string().as_str()));
    suite_start.push_attribute(("failures", failed_steps(scenario).to_string().as_str()));
    suite_start.push_attribute(("skipped", skipped_steps(scenario).to_string().as_str()));
    suite_start.push_attribute(("time", time.as_str()));
    suite_start.push_attribute(("timestamp", timestamp.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    let classname = format!("{}.{}", site, scenario.name);
    for step in &scenario.steps {
        let step_time = (step.duration_ms.unwrap_or(0) as f64 / 1000.0).to_string();

        let mut case_start = BytesStart::new("testcase");
        case_start.push_attribute(("name", step.name.as_str()));
        case_start.push_attribute(("classname", classname.as_str()));
        case_start.push_attribute(("time", step_time.as_str()));
        writer.write_event(Event::Start(case_start))?;

        match &step.status {
            StepStatus::Failed { error } => {
                let mut fail_start = BytesStart::new("failure");
                fail_start.push_attribute(("message", error.as_str()));
                fail_start.push_attribute(("type", "StepFailure"));
                writer.write_event(Event::Start(fail_start))?;
                writer.write_event(Event::Text(BytesText::new(error)))?;
                writer.write_event(Event::End(BytesEnd::new("failure")))?;
            }
            StepStatus::Skipped { reason } => {
                let mut skip_start = BytesStart::new("skipped");
                skip_start.push_attribute(("message", reason.as_str()));
                writer.write_event(Event::Empty(skip_start))?;
            }
            _ => {}
        }

        writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    Ok(())
}

fn failed_steps(scenario: &ScenarioResult) -> usize {
    scenario
        .steps
        .iter()
        .filter(|s| matches!(s.status, StepStatus::Failed { .. }))
        .count()
}

fn skipped_steps(scenario: &ScenarioResult) -> usize {
    scenario
        .steps
        .iter()
        .filter(|s| matches!(s.status, StepStatus::Skipped { .. }))
        .count()
}

pub fn write_report(report: &SuiteReport, output_dir: &Path) -> Result<PathBuf> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)
        .with_context(|| format!("failed to write JUnit report to {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::sample_report;

    #[test]
    fn test_generate_junit_xml() {
        let xml = generate_junit_xml(&sample_report()).unwrap();

        assert!(xml.contains(r#"<testsuites name="cartwright-run""#));
        assert!(xml.contains(r#"tests="5""#));
        assert!(xml.contains(r#"failures="1""#));
        assert!(xml.contains(r#"skipped="1""#));
        assert!(xml.contains(r#"<testsuite name="product_search""#));
        assert!(xml.contains(r#"classname="demo-shop.checkout_flow_chromium""#));
        assert!(xml.contains(r#"type="StepFailure""#));
        assert!(xml.contains(r#"<skipped message="Previous step failed"/>"#));
    }

    #[test]
    fn test_failure_text_is_escaped() {
        let xml = generate_junit_xml(&sample_report()).unwrap();

        assert!(xml.contains("&lt;button&gt;"));
        assert!(!xml.contains("<button> detached"));
    }

    #[test]
    fn test_write_report_creates_junit_xml() {
        let dir = std::env::temp_dir().join(format!("cartwright-junit-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let path = write_report(&sample_report(), &dir).unwrap();
        assert!(path.ends_with("junit.xml"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("<?xml"));

        std::fs::remove_dir_all(&dir).ok();
    }
}
