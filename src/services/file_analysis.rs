//! Lightweight per-file diagnostics for the change tracker.
//!
//! Everything here is heuristic pattern matching over raw text. A hook name in a
//! comment counts as a use and an aliased import is missed; that imprecision is
//! accepted since the results only feed an advisory health score.

use crate::models::{ChangeLog, ChangeType, Health};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;

/// Length of the content fingerprint in characters
pub const FINGERPRINT_LEN: usize = 16;

/// Lines after a `.map(` call that may carry its `key=` prop
const KEY_PROP_LOOKAHEAD: usize = 3;

pub const MISSING_IMPORT_ERROR: &str = "React hook used without importing it from 'react'";
pub const MISSING_KEY_WARNING: &str = "List rendering (.map) without a key prop";
pub const CONSOLE_WARNING: &str = "console.log statement found";

/// Findings of the heuristic battery for one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiagnostics {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Short change-detection hint for `content`: the first [`FINGERPRINT_LEN`] characters
/// of its base64 encoding.
///
/// This is not a hash. Two files sharing their first 12 bytes get the same value, so
/// use it only to notice that something probably changed, never as an integrity proof.
pub fn fingerprint(content: &str) -> String {
    // 12 input bytes encode to exactly 16 base64 characters
    let bytes = content.as_bytes();
    let head = &bytes[..bytes.len().min(FINGERPRINT_LEN / 4 * 3)];
    STANDARD.encode(head)
}

fn dependency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"import\s+.*?\s+from\s+['"]([^'"]+)['"]"#).expect("Invalid import regex")
    })
}

fn hook_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\buse(?:State|Effect|Context|Ref|Memo|Callback|Reducer)\(")
            .expect("Invalid hook regex")
    })
}

/// Targets of `import ... from '<module>'` statements, in source order.
pub fn extract_dependencies(content: &str) -> Vec<String> {
    dependency_pattern()
        .captures_iter(content)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Run the fixed heuristic battery. Each check reports at most once per file.
pub fn run_heuristics(content: &str) -> FileDiagnostics {
    let mut diagnostics = FileDiagnostics::default();

    let imports_react = content.contains("from 'react'") || content.contains("from \"react\"");
    if hook_pattern().is_match(content) && !imports_react {
        diagnostics.errors.push(MISSING_IMPORT_ERROR.to_string());
    }

    let lines: Vec<&str> = content.lines().collect();
    let missing_key = lines.iter().enumerate().any(|(i, line)| {
        line.contains(".map(")
            && !lines[i..lines.len().min(i + 1 + KEY_PROP_LOOKAHEAD)]
                .iter()
                .any(|l| l.contains("key="))
    });
    if missing_key {
        diagnostics.warnings.push(MISSING_KEY_WARNING.to_string());
    }

    if content.contains("console.log(") {
        diagnostics.warnings.push(CONSOLE_WARNING.to_string());
    }

    diagnostics
}

/// Classify a root-relative, `/`-separated path.
///
/// Root-level files are configuration; anything under a `pages`/`routes` directory
/// is a route; anything under `components` or with a JSX extension is a component.
pub fn classify_path(relative: &str) -> ChangeType {
    if !relative.contains('/') {
        return ChangeType::Config;
    }

    let segments: Vec<&str> = relative.split('/').collect();
    let dirs = &segments[..segments.len() - 1];
    if dirs.iter().any(|d| *d == "pages" || *d == "routes") {
        return ChangeType::Route;
    }
    if dirs.contains(&"components") || relative.ends_with(".tsx") || relative.ends_with(".jsx") {
        return ChangeType::Component;
    }
    ChangeType::File
}

/// Whether a root-relative path is a static asset.
pub fn is_asset_path(relative: &str) -> bool {
    const ASSET_EXTENSIONS: [&str; 12] = [
        "png", "jpg", "jpeg", "gif", "svg", "webp", "ico", "avif", "woff", "woff2", "ttf", "mp4",
    ];

    if relative.starts_with("public/") || relative.starts_with("src/assets/") {
        return true;
    }
    relative
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

/// Recompute health from the `window` most recent changes (newest first).
///
/// Score is `100 - 5 * errors - 2 * warnings`, floored at 0. Issues are the
/// de-duplicated messages of those changes, capped at `issue_cap`.
pub fn compute_health(changes: &[ChangeLog], window: usize, issue_cap: usize) -> Health {
    let recent = &changes[..changes.len().min(window)];

    let errors: usize = recent.iter().map(ChangeLog::error_count).sum();
    let warnings: usize = recent.iter().map(ChangeLog::warning_count).sum();
    let penalty = errors.saturating_mul(5).saturating_add(warnings.saturating_mul(2));
    let score = 100usize.saturating_sub(penalty) as u32;

    let mut issues: Vec<String> = Vec::new();
    let messages = recent.iter().flat_map(|change| {
        change
            .errors
            .iter()
            .flatten()
            .chain(change.warnings.iter().flatten())
    });
    for message in messages {
        if issues.len() >= issue_cap {
            break;
        }
        if !issues.contains(message) {
            issues.push(message.clone());
        }
    }

    Health {
        score,
        issues,
        last_check: Utc::now(),
    }
}
