use super::types::SuiteReport;
use crate::runner::scenario::ScenarioStatus;
use crate::steps::StepStatus;

pub fn render(report: &SuiteReport) -> String {
    let suite = &report.suite;
    let pass_rate = suite.success_rate() as u32;

    let mut scenarios_html = String::new();
    for scenario in &suite.scenarios {
        let (status_text, status_class) = match scenario.status {
            ScenarioStatus::Succeeded => ("Passed", "passed"),
            ScenarioStatus::Failed => ("Failed", "failed"),
        };

        let mut steps_html = String::new();
        for step in &scenario.steps {
            let (status_icon, step_class) = match &step.status {
                StepStatus::Succeeded => ("✓", "passed"),
                StepStatus::Failed { .. } => ("✗", "failed"),
                StepStatus::Skipped { .. } => ("○", "skipped"),
                StepStatus::Running => ("⋯", "running"),
                StepStatus::Pending => ("○", "pending"),
            };

            let screenshot_html = if let Some(path) = &step.artifact {
                format!(
                    r##"<a href="#" class="screenshot-link" onclick="showScreenshot('{}')">📸 View Screenshot</a>"##,
                    path
                )
            } else {
                String::new()
            };

            let detail_html = match &step.status {
                StepStatus::Failed { error } => format!(
                    r##"<div class="error-message">{}</div>"##,
                    html_escape(error)
                ),
                StepStatus::Skipped { reason } => format!(
                    r##"<div class="skip-reason">{}</div>"##,
                    html_escape(reason)
                ),
                _ => String::new(),
            };

            let duration_html = step
                .duration_ms
                .map(|d| format!("<span class=\"duration\">{}ms</span>", d))
                .unwrap_or_default();

            let onclick = if let Some(path) = &step.artifact {
                format!("showScreenshot('{}')", path)
            } else {
                "".to_string()
            };

            steps_html.push_str(&format!(
                r##"
                <div class="step {step_class}" onclick="{onclick}">
                    <div class="step-icon">{status_icon}</div>
                    <div class="step-content">
                        <div class="step-name">{}</div>
                        <div class="step-meta">
                            {duration_html}
                            {screenshot_html}
                        </div>
                        {detail_html}
                    </div>
                </div>
            "##,
                html_escape(&step.display),
                step_class = step_class,
                status_icon = status_icon,
                duration_html = duration_html,
                screenshot_html = screenshot_html,
                detail_html = detail_html,
                onclick = onclick
            ));
        }

        let error_html = scenario
            .error
            .as_ref()
            .map(|e| {
                format!(
                    r##"<div class="error-message scenario-error">{}</div>"##,
                    html_escape(e)
                )
            })
            .unwrap_or_default();

        scenarios_html.push_str(&format!(
            r#"
            <div class="scenario {status_class}">
                <div class="scenario-header">
                    <h3>{} <span class="browser-tag">{}</span> <span class="status-badge">{status_text}</span></h3>
                    <span class="duration">{}ms</span>
                </div>
                <div class="steps">
                    {steps_html}
                </div>
                {error_html}
            </div>
        "#,
            html_escape(&scenario.name),
            scenario.browser,
            scenario.duration_ms,
            status_class = status_class,
            status_text = status_text,
            steps_html = steps_html,
            error_html = error_html
        ));
    }

    let insights_html = suite
        .performance
        .insights
        .as_ref()
        .map(|insights| {
            format!(
                r#"
        <div class="insights">
            <h2>🤖 Advisory Insights</h2>
            <p>{}</p>
        </div>
        "#,
                html_escape(insights)
            )
        })
        .unwrap_or_default();

    let summary = suite.summary();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Test Report - {site}</title>
    <link rel="preconnect" href="https://fonts.googleapis.com">
    <link rel="preconnect" href="https://fonts.gstatic.com" crossorigin>
    <link href="https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700;800&family=JetBrains+Mono:wght@400;500&display=swap" rel="stylesheet">
    <style>
        :root {{
            --bg-primary: #0a0f1d;
            --bg-secondary: #141b2d;
            --bg-tertiary: #1f2937;
            --border: #374151;
            --text-primary: #f9fafb;
            --text-secondary: #9ca3af;
            --green: #10b981;
            --red: #ef4444;
            --yellow: #f59e0b;
            --blue: #3b82f6;
            --purple: #8b5cf6;
            --glass: rgba(255, 255, 255, 0.03);
        }}

        * {{
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }}

        body {{
            font-family: 'Inter', system-ui, -apple-system, sans-serif;
            background: var(--bg-primary);
            color: var(--text-primary);
            line-height: 1.5;
            padding: 3rem 1rem;
        }}

        .container {{
            max-width: 1100px;
            margin: 0 auto;
        }}

        header {{
            margin-bottom: 3rem;
            display: flex;
            justify-content: space-between;
            align-items: flex-end;
        }}

        h1 {{
            font-size: 2.25rem;
            font-weight: 800;
            letter-spacing: -0.025em;
            background: linear-gradient(135deg, #fff 0%, #94a3b8 100%);
            -webkit-background-clip: text;
            -webkit-text-fill-color: transparent;
        }}

        .summary {{
            display: grid;
            grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
            gap: 1.5rem;
            margin-bottom: 3rem;
        }}

        .stat {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            padding: 1.5rem;
            border-radius: 1rem;
            position: relative;
            overflow: hidden;
            transition: transform 0.2s;
        }}

        .stat:hover {{
            transform: translateY(-2px);
        }}

        .stat-value {{
            font-size: 2.5rem;
            font-weight: 800;
            margin-bottom: 0.25rem;
        }}

        .stat-label {{
            color: var(--text-secondary);
            font-size: 0.875rem;
            font-weight: 500;
            text-transform: uppercase;
            letter-spacing: 0.05em;
        }}

        .stat.passed .stat-value {{ color: var(--green); }}
        .stat.failed .stat-value {{ color: var(--red); }}

        .progress-container {{
            margin-bottom: 4rem;
        }}

        .progress-bar {{
            background: var(--bg-secondary);
            height: 12px;
            border-radius: 6px;
            overflow: hidden;
            display: flex;
            border: 1px solid var(--border);
        }}

        .progress-fill {{
            height: 100%;
            background: linear-gradient(90deg, var(--green), #34d399);
            transition: width 0.8s cubic-bezier(0.16, 1, 0.3, 1);
        }}

        .scenario {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 1.25rem;
            margin-bottom: 2rem;
            overflow: hidden;
            box-shadow: 0 4px 6px -1px rgba(0, 0, 0, 0.1);
        }}

        .scenario-header {{
            padding: 1.5rem;
            background: var(--glass);
            display: flex;
            justify-content: space-between;
            align-items: center;
            border-bottom: 1px solid var(--border);
        }}

        .scenario-header h3 {{
            font-size: 1.25rem;
            font-weight: 700;
            display: flex;
            align-items: center;
            gap: 0.75rem;
        }}

        .browser-tag {{
            padding: 0.25rem 0.75rem;
            border-radius: 9999px;
            font-size: 0.75rem;
            font-weight: 600;
            background: rgba(59, 130, 246, 0.1);
            color: var(--blue);
        }}

        .status-badge {{
            padding: 0.25rem 0.75rem;
            border-radius: 9999px;
            font-size: 0.75rem;
            font-weight: 600;
            text-transform: uppercase;
        }}

        .scenario.passed .status-badge {{ background: rgba(16, 185, 129, 0.1); color: var(--green); }}
        .scenario.failed .status-badge {{ background: rgba(239, 68, 68, 0.1); color: var(--red); }}

        .steps {{
            padding: 1rem 1.5rem;
        }}

        .step {{
            padding: 1rem;
            border-radius: 0.75rem;
            display: flex;
            align-items: flex-start;
            gap: 1rem;
            margin-bottom: 0.5rem;
            transition: background 0.2s;
            cursor: pointer;
        }}

        .step:hover {{
            background: var(--bg-tertiary);
        }}

        .step-icon {{
            width: 2rem;
            height: 2rem;
            display: flex;
            align-items: center;
            justify-content: center;
            border-radius: 0.5rem;
            font-size: 1.25rem;
            flex-shrink: 0;
        }}

        .step.passed .step-icon {{ background: rgba(16, 185, 129, 0.1); color: var(--green); }}
        .step.failed .step-icon {{ background: rgba(239, 68, 68, 0.1); color: var(--red); }}
        .step.skipped .step-icon {{ background: rgba(245, 158, 11, 0.1); color: var(--yellow); }}

        .step-content {{
            flex: 1;
        }}

        .step-name {{
            font-family: 'JetBrains Mono', monospace;
            font-size: 0.9375rem;
            font-weight: 500;
            color: var(--text-primary);
        }}

        .step-meta {{
            display: flex;
            gap: 1rem;
            margin-top: 0.25rem;
        }}

        .duration {{
            color: var(--text-secondary);
            font-size: 0.75rem;
            font-weight: 500;
        }}

        .screenshot-link {{
            color: var(--blue);
            font-size: 0.75rem;
            font-weight: 600;
            text-decoration: none;
            display: flex;
            align-items: center;
            gap: 0.25rem;
        }}

        .screenshot-link:hover {{
            text-decoration: underline;
        }}

        .error-message {{
            background: rgba(239, 68, 68, 0.1);
            border-radius: 0.5rem;
            padding: 0.75rem;
            margin-top: 0.75rem;
            color: #fca5a5;
            font-size: 0.8125rem;
            font-family: 'JetBrains Mono', monospace;
            border: 1px solid rgba(239, 68, 68, 0.2);
        }}

        .scenario-error {{
            margin: 0 1.5rem 1.5rem 1.5rem;
        }}

        .skip-reason {{
            color: var(--yellow);
            font-size: 0.8125rem;
            margin-top: 0.5rem;
        }}

        .insights {{
            background: var(--bg-secondary);
            border: 1px solid var(--border);
            border-radius: 1.25rem;
            padding: 1.5rem;
            margin-bottom: 2rem;
        }}

        .insights h2 {{
            font-size: 1.125rem;
            margin-bottom: 0.75rem;
            color: var(--purple);
        }}

        .insights p {{
            color: var(--text-secondary);
            font-size: 0.9375rem;
        }}

        .meta {{
            margin-top: 4rem;
            padding-top: 2rem;
            border-top: 1px solid var(--border);
            color: var(--text-secondary);
            font-size: 0.875rem;
            text-align: center;
            display: flex;
            justify-content: center;
            gap: 2rem;
        }}

        /* Modal */
        #modal {{
            display: none;
            position: fixed;
            z-index: 100;
            top: 0;
            left: 0;
            width: 100%;
            height: 100%;
            background: rgba(0, 0, 0, 0.9);
            padding: 2rem;
            align-items: center;
            justify-content: center;
        }}

        #modal img {{
            max-width: 100%;
            max-height: 100%;
            border-radius: 0.5rem;
            box-shadow: 0 25px 50px -12px rgba(0, 0, 0, 0.5);
        }}

        #modal.active {{
            display: flex;
        }}
    </style>
</head>
<body>
    <div class="container">
        <header>
            <div>
                <div style="font-size: 0.875rem; font-weight: 600; color: var(--purple); text-transform: uppercase; letter-spacing: 0.1em; margin-bottom: 0.5rem;">Storefront Testing</div>
                <h1>{site} · {suite_name}</h1>
            </div>
            <div style="text-align: right;">
                <div style="font-size: 0.875rem; color: var(--text-secondary);">Run Duration</div>
                <div style="font-size: 1.25rem; font-weight: 700;">{duration}</div>
            </div>
        </header>

        <div class="summary">
            <div class="stat">
                <div class="stat-value">{total}</div>
                <div class="stat-label">Scenarios</div>
            </div>
            <div class="stat passed">
                <div class="stat-value">{passed}</div>
                <div class="stat-label">Passed</div>
            </div>
            <div class="stat failed">
                <div class="stat-value">{failed}</div>
                <div class="stat-label">Failed</div>
            </div>
            <div class="stat">
                <div class="stat-value">{avg_ms}ms</div>
                <div class="stat-label">Avg Scenario</div>
            </div>
        </div>

        <div class="progress-container">
            <div style="display: flex; justify-content: space-between; margin-bottom: 0.75rem;">
                <span style="font-weight: 600; font-size: 0.875rem;">Success Rate</span>
                <span style="font-weight: 700; color: var(--green);">{pass_rate}%</span>
            </div>
            <div class="progress-bar">
                <div class="progress-fill" style="width: {pass_rate}%"></div>
            </div>
        </div>

        {insights_html}

        {scenarios_html}

        <div class="meta">
            <span>Run: {run_id}</span>
            <span>Generated: {generated_at}</span>
        </div>
    </div>

    <div id="modal" onclick="this.classList.remove('active')">
        <img id="modal-img" src="" alt="Screenshot">
    </div>

    <script>
        function showScreenshot(path) {{
            const modal = document.getElementById('modal');
            const img = document.getElementById('modal-img');
            img.src = path;
            modal.classList.add('active');
            event.stopPropagation();
        }}
    </script>
</body>
</html>"#,
        site = html_escape(&suite.site),
        suite_name = html_escape(&suite.suite),
        duration = format_duration(summary.total_duration_ms),
        total = suite.total,
        passed = suite.passed,
        failed = suite.failed,
        avg_ms = suite.performance.average_duration_ms.round() as u64,
        pass_rate = pass_rate,
        insights_html = insights_html,
        scenarios_html = scenarios_html,
        run_id = html_escape(&suite.run_id),
        generated_at = report.report_metadata.generated_at.to_rfc3339()
    )
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60000;
        let seconds = (ms % 60000) as f64 / 1000.0;
        format!("{}m {:.0}s", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::sample_report;

    #[test]
    fn test_render_includes_summary_and_scenarios() {
        let html = render(&sample_report());

        assert!(html.contains("<title>Test Report - demo-shop</title>"));
        assert!(html.contains("product_search"));
        assert!(html.contains("checkout_flow_chromium"));
        assert!(html.contains(">50%</span>"));
        assert!(html.contains("Advisory Insights"));
        assert!(html.contains("Checkout submit dominated the runtime."));
    }

    #[test]
    fn test_render_escapes_error_markup() {
        let html = render(&sample_report());

        assert!(html.contains("click failed: &lt;button&gt; detached"));
        assert!(!html.contains("click failed: <button> detached"));
    }

    #[test]
    fn test_render_links_screenshot_artifacts() {
        let html = render(&sample_report());
        assert!(html
            .contains("showScreenshot('reports/screenshots/checkout_flow_chromium_error_1.png')"));
    }

    #[test]
    fn test_format_duration_scales_units() {
        assert_eq!(format_duration(640), "640ms");
        assert_eq!(format_duration(5400), "5.4s");
        assert_eq!(format_duration(90_000), "1m 30s");
    }
}
