//! HTML rendering of a run. String formatting only; nothing here touches
//! the filesystem or the network.

use super::types::{Run, Step, TestCase};

const PASS_COLOR: &str = "#10b981";
const FAIL_COLOR: &str = "#ef4444";

/// Render a full run as a standalone HTML document.
pub fn render(run: &Run) -> String {
    let status_color = if run.passed { PASS_COLOR } else { FAIL_COLOR };
    let status_text = if run.passed { "PASSED" } else { "FAILED" };
    let status_icon = if run.passed { "&#10003;" } else { "&#10007;" };

    let cases_html: String = run
        .test_cases
        .iter()
        .enumerate()
        .map(|(i, case)| render_case(case, i + 1))
        .collect();

    let error_html = match &run.error {
        Some(error) => format!(
            r#"<div class="error-box"><strong>Run error:</strong> {}</div>"#,
            escape(error)
        ),
        None => String::new(),
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<div class="header">
  <h1>{title}</h1>
  <div class="status" style="color: {status_color}">{status_icon} {status_text}</div>
  <div class="meta">
    <span>Host: {host}</span>
    <span>Started: {start}</span>
    <span>Duration: {duration}</span>
    <span>Cases: {passed_count}/{total_count} passed</span>
  </div>
</div>
{error}
{cases}
</body>
</html>
"#,
        title = escape(&run.name),
        style = STYLE,
        status_color = status_color,
        status_icon = status_icon,
        status_text = status_text,
        host = escape(&run.host),
        start = run.start_time.format("%Y-%m-%d %H:%M:%S UTC"),
        duration = format_duration(run.duration()),
        passed_count = run.passed_count(),
        total_count = run.test_cases.len(),
        error = error_html,
        cases = cases_html,
    )
}

fn render_case(case: &TestCase, index: usize) -> String {
    let status_color = if case.passed { PASS_COLOR } else { FAIL_COLOR };
    let status_icon = if case.passed { "&#10003;" } else { "&#10007;" };
    let steps_html: String = case.steps.iter().map(render_step).collect();

    let error_html = match &case.error {
        Some(error) => format!(
            r#"<div class="error-box">{}</div>"#,
            escape(error)
        ),
        None => String::new(),
    };

    format!(
        r#"<details class="test-case" {open}>
  <summary>
    <span class="case-status" style="color: {status_color}">{status_icon}</span>
    <span class="case-name">{index}. {name}</span>
    <span class="case-duration">{duration}</span>
  </summary>
  {error}
  <table class="steps">
    <tr><th></th><th>Step</th><th>Duration</th><th>Detail</th></tr>
    {steps}
  </table>
</details>
"#,
        open = if case.passed { "" } else { "open" },
        status_color = status_color,
        status_icon = status_icon,
        index = index,
        name = escape(&case.name),
        duration = format_duration(case.duration()),
        error = error_html,
        steps = steps_html,
    )
}

fn render_step(step: &Step) -> String {
    let status_color = if step.passed { PASS_COLOR } else { FAIL_COLOR };
    let status_icon = if step.passed { "&#10003;" } else { "&#10007;" };
    format!(
        r#"<tr><td style="color: {status_color}">{status_icon}</td><td>{name}</td><td>{duration}</td><td>{detail}</td></tr>
"#,
        status_color = status_color,
        status_icon = status_icon,
        name = escape(&step.name),
        duration = format_duration(step.duration()),
        detail = escape(&step.detail).replace('\n', "<br>"),
    )
}

/// Millisecond-precision human duration, e.g. "3.4s" or "2m 05s"
fn format_duration(duration: chrono::Duration) -> String {
    let millis = duration.num_milliseconds().max(0);
    let secs = millis / 1000;
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{}.{}s", secs, (millis % 1000) / 100)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

const STYLE: &str = r#"
body { font-family: -apple-system, Segoe UI, sans-serif; margin: 2rem auto; max-width: 60rem; color: #1f2937; }
.header { border-bottom: 2px solid #e5e7eb; padding-bottom: 1rem; margin-bottom: 1rem; }
.header h1 { margin: 0 0 0.5rem 0; }
.status { font-size: 1.5rem; font-weight: bold; }
.meta span { margin-right: 1.5rem; color: #6b7280; font-size: 0.9rem; }
.test-case { border: 1px solid #e5e7eb; border-radius: 6px; margin: 0.75rem 0; padding: 0.5rem 1rem; }
.test-case summary { cursor: pointer; display: flex; gap: 0.75rem; align-items: baseline; }
.case-name { font-weight: 600; }
.case-duration { margin-left: auto; color: #6b7280; }
.steps { width: 100%; border-collapse: collapse; margin-top: 0.5rem; }
.steps th, .steps td { text-align: left; padding: 0.3rem 0.6rem; border-top: 1px solid #f3f4f6; font-size: 0.9rem; }
.error-box { background: #fef2f2; border: 1px solid #ef4444; border-radius: 6px; padding: 0.6rem 1rem; margin: 0.5rem 0; }
"#;
