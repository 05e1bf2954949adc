use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Severity attached to every finding produced by the scanners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    /// Console icon used by the report printers
    pub fn icon(self) -> &'static str {
        match self {
            Severity::Error => "❌",
            Severity::Warning => "⚠️",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// A single pattern rule checked line by line by the rule scanner.
///
/// Rules are built once per scanner and never change afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    #[serde(serialize_with = "serialize_pattern")]
    pub pattern: Regex,
    pub message: String,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Rule {
    /// Build a rule from a regex source.
    ///
    /// # Errors
    /// Returns the regex compile error when `pattern` is not a valid expression.
    pub fn new(
        pattern: &str,
        message: impl Into<String>,
        severity: Severity,
        fix: Option<&str>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            message: message.into(),
            severity,
            fix: fix.map(str::to_string),
        })
    }
}

fn serialize_pattern<S: Serializer>(pattern: &Regex, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(pattern.as_str())
}

/// One rule match at a 1-based line and column.
#[derive(Debug, Clone, Serialize)]
pub struct Issue {
    pub rule: Rule,
    pub line: usize,
    pub column: usize,
}

impl Issue {
    pub fn severity(&self) -> Severity {
        self.rule.severity
    }
}

impl PartialEq for Issue {
    fn eq(&self, other: &Self) -> bool {
        self.line == other.line
            && self.column == other.column
            && self.rule.severity == other.rule.severity
            && self.rule.message == other.rule.message
            && self.rule.pattern.as_str() == other.rule.pattern.as_str()
    }
}

/// A problem found with an `href`/`src` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkIssue {
    pub file: String,
    pub line: usize,
    pub link: String,
    pub issue: String,
    pub severity: Severity,
}
