//! Report rendering.
//!
//! Pure functions of a [`ValidationResult`]: violations are listed in the
//! order the result holds them and nothing is filtered.

use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::Path;

use crate::types::{ValidationResult, Violation};

/// Output format for [`render`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Structured,
    Html,
    Markdown,
}

/// A rendered report.
#[derive(Debug, Clone, PartialEq)]
pub enum Report {
    /// The result itself, for JSON serialization
    Structured(ValidationResult),
    Html(String),
    Markdown(String),
}

impl Report {
    /// Write the report to a file. Structured reports are written as
    /// pretty-printed JSON.
    pub fn write_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let body = match self {
            Report::Structured(result) => serde_json::to_string_pretty(result)?,
            Report::Html(s) | Report::Markdown(s) => s.clone(),
        };
        fs::write(path, body)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Structured(result) => {
                let json = serde_json::to_string_pretty(result).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
            Report::Html(s) | Report::Markdown(s) => f.write_str(s),
        }
    }
}

/// Render a validation result.
pub fn render(result: &ValidationResult, format: ReportFormat) -> Report {
    match format {
        ReportFormat::Structured => Report::Structured(result.clone()),
        ReportFormat::Html => Report::Html(render_html(result)),
        ReportFormat::Markdown => Report::Markdown(render_markdown(result)),
    }
}

fn banner(result: &ValidationResult) -> &'static str {
    if result.is_valid {
        "PASSED"
    } else {
        "FAILED"
    }
}

/// `[source] identifier: message`
fn entry(violation: &Violation) -> String {
    format!(
        "[{}] {}: {}",
        violation.source.as_str(),
        violation.identifier,
        violation.message
    )
}

/// Collapse line breaks so an entry stays one list item.
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_markdown(result: &ValidationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Validation {}", banner(result));
    let _ = writeln!(out);
    let _ = writeln!(out, "**Violations:** {}", result.violations.len());

    if !result.violations.is_empty() {
        let _ = writeln!(out);
        for (i, violation) in result.violations.iter().enumerate() {
            let _ = writeln!(out, "{}. {}", i + 1, single_line(&entry(violation)));
        }
    }
    out
}

fn render_html(result: &ValidationResult) -> String {
    let status = banner(result);
    let mut out = String::new();
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Validation Report</title>\n</head>\n<body>\n");
    let _ = writeln!(
        out,
        "<h1 class=\"{}\">Validation {}</h1>",
        status.to_lowercase(),
        status
    );
    let _ = writeln!(out, "<p>Violations: {}</p>", result.violations.len());

    if !result.violations.is_empty() {
        out.push_str("<ol>\n");
        for violation in &result.violations {
            let _ = writeln!(out, "<li>{}</li>", escape_html(&entry(violation)));
        }
        out.push_str("</ol>\n");
    }

    out.push_str("</body>\n</html>\n");
    out
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
