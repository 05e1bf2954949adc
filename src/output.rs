//! Console rendering for scanner, validator, recorder and tracker reports.
//!
//! Every report has a pure `compose_*` function returning the text (with or without
//! ANSI colors) and a `print_*` wrapper. Colors are disabled when `NO_COLOR` is set.

use crate::models::{Health, Issue, LinkIssue, PerformanceMetric, Severity};
use crate::services::memory::format_mb;
use owo_colors::OwoColorize;
use std::fmt::Write;

/// Whether console output should carry ANSI colors
pub fn use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none()
}

fn paint_severity(severity: Severity, text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match severity {
        Severity::Error => text.red().bold().to_string(),
        Severity::Warning => text.yellow().bold().to_string(),
    }
}

fn header(text: &str, color: bool) -> String {
    if color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

fn hint(text: &str, color: bool) -> String {
    if color {
        text.bright_black().to_string()
    } else {
        text.to_string()
    }
}

/// Rule scanner block for one file: header, one line per issue and fix hints.
pub fn compose_scan_report(file: &str, issues: &[Issue], color: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n🔍 {}", header(&format!("Issues in {}:", file), color));
    for issue in issues {
        let severity = issue.severity();
        let _ = writeln!(
            out,
            "  {} {}:{} {}",
            severity.icon(),
            issue.line,
            issue.column,
            paint_severity(severity, &issue.rule.message, color)
        );
        if let Some(fix) = &issue.rule.fix {
            let _ = writeln!(out, "     {}", hint(&format!("💡 Fix: {}", fix), color));
        }
    }
    out
}

pub fn print_scan_report(file: &str, issues: &[Issue]) {
    print!("{}", compose_scan_report(file, issues, use_colors()));
}

/// Link validator block, grouped by file in first-seen order.
pub fn compose_link_report(issues: &[LinkIssue], color: bool) -> String {
    let mut out = String::new();
    let mut files: Vec<&str> = Vec::new();
    for issue in issues {
        if !files.contains(&issue.file.as_str()) {
            files.push(&issue.file);
        }
    }

    for file in files {
        let _ = writeln!(out, "\n🔗 {}", header(&format!("Link issues in {}:", file), color));
        for issue in issues.iter().filter(|i| i.file == file) {
            let _ = writeln!(
                out,
                "  {} line {}: {} {}",
                issue.severity.icon(),
                issue.line,
                paint_severity(issue.severity, &issue.issue, color),
                hint(&format!("({})", issue.link), color)
            );
        }
    }

    let errors = issues.iter().filter(|i| i.severity.is_error()).count();
    if errors > 0 {
        let _ = writeln!(
            out,
            "\n{}",
            paint_severity(
                Severity::Warning,
                &format!(
                    "⚠️  {} link error(s) found. Fix them before deploying; the build continues.",
                    errors
                ),
                color
            )
        );
    }
    out
}

pub fn print_link_report(issues: &[LinkIssue]) {
    if issues.is_empty() {
        return;
    }
    print!("{}", compose_link_report(issues, use_colors()));
}

/// Build summary followed by bundle warnings and recommendations.
pub fn compose_performance_summary(
    metric: &PerformanceMetric,
    recommendations: &[String],
    color: bool,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n📊 {}", header("Build Performance", color));
    let _ = writeln!(out, "  ⏱️  Build time: {:.2}s", metric.build_time as f64 / 1000.0);
    let _ = writeln!(
        out,
        "  📦 Bundle size: {:.2} KB",
        metric.bundle_size as f64 / 1024.0
    );
    let _ = writeln!(out, "  🧩 Chunks: {}", metric.chunk_count);
    let _ = writeln!(out, "  🖼️  Assets: {}", metric.asset_count);
    let _ = writeln!(
        out,
        "  💾 Memory: {} / {}",
        format_mb(metric.memory_usage.heap_used),
        format_mb(metric.memory_usage.heap_total)
    );

    for warning in &metric.warnings {
        let _ = writeln!(
            out,
            "  {} {}",
            Severity::Warning.icon(),
            paint_severity(Severity::Warning, warning, color)
        );
    }

    if !recommendations.is_empty() {
        let _ = writeln!(out, "\n💡 {}", header("Recommendations:", color));
        for tip in recommendations {
            let _ = writeln!(out, "  - {}", tip);
        }
    }
    out
}

pub fn print_performance_summary(metric: &PerformanceMetric, recommendations: &[String]) {
    print!(
        "{}",
        compose_performance_summary(metric, recommendations, use_colors())
    );
}

/// Health score line with any outstanding issues.
pub fn compose_health(health: &Health, color: bool) -> String {
    let mut out = String::new();
    let score = format!("{}/100", health.score);
    let score = if !color {
        score
    } else if health.score >= 80 {
        score.green().bold().to_string()
    } else if health.score >= 50 {
        score.yellow().bold().to_string()
    } else {
        score.red().bold().to_string()
    };
    let _ = writeln!(out, "\n🏥 {} {}", header("Website health:", color), score);
    for issue in &health.issues {
        let _ = writeln!(out, "  - {}", issue);
    }
    out
}

pub fn print_health(health: &Health) {
    print!("{}", compose_health(health, use_colors()));
}
