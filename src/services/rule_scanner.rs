use crate::models::{Issue, Rule, Severity};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use thiserror::Error;

/// Errors raised while checking a file on disk
#[derive(Error, Debug)]
pub enum ScanError {
    /// The file vanished or could not be decoded; callers treat this as "nothing to report"
    #[error("Cannot read {path}: {source}")]
    Unreadable {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Line-oriented pattern scanner for source files.
///
/// Every line is tested against every rule; a rule reports at most one issue per
/// line (its first match) while several rules may hit the same line. The rule list
/// is fixed at construction.
#[derive(Debug, Clone)]
pub struct RuleScanner {
    rules: Vec<Rule>,
}

impl RuleScanner {
    /// Create a scanner with the built-in rule set
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Create a scanner with a custom rule set
    pub fn with_rules(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Scan text content and return issues in line order, then rule order.
    pub fn scan(&self, content: &str) -> Vec<Issue> {
        let mut issues = Vec::new();

        for (index, line) in content.lines().enumerate() {
            for rule in &self.rules {
                if let Some(found) = rule.pattern.find(line) {
                    issues.push(Issue {
                        rule: rule.clone(),
                        line: index + 1,
                        column: line[..found.start()].chars().count() + 1,
                    });
                }
            }
        }

        issues
    }

    /// Re-read `path` from disk and scan it.
    pub fn check_file(&self, path: &Utf8Path) -> Result<Vec<Issue>, ScanError> {
        let content = fs::read_to_string(path).map_err(|source| ScanError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(self.scan(&content))
    }
}

impl Default for RuleScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Count error-severity issues
pub fn error_count(issues: &[Issue]) -> usize {
    issues.iter().filter(|i| i.severity().is_error()).count()
}

fn default_rules() -> Vec<Rule> {
    let specs: [(&str, &str, Severity, Option<&str>); 7] = [
        (
            r"console\.log\(",
            "console.log statement left in code",
            Severity::Warning,
            Some("Remove it or route the message through a logger"),
        ),
        (
            r"^\s*debugger\b",
            "debugger statement left in code",
            Severity::Error,
            Some("Remove the debugger statement"),
        ),
        (
            r"\beval\s*\(",
            "Use of eval() is not allowed",
            Severity::Error,
            Some("Parse the data explicitly instead of evaluating strings"),
        ),
        (
            r"useState\(\s*\)",
            "useState called without an initial value",
            Severity::Warning,
            Some("Pass an explicit initial state, e.g. useState(null)"),
        ),
        (
            r#"href=["']#["']"#,
            "Placeholder link (href=\"#\")",
            Severity::Warning,
            Some("Point the link to a real route or render a button"),
        ),
        (
            r":\s*any\b",
            "Avoid the 'any' type",
            Severity::Warning,
            Some("Use a concrete type or 'unknown'"),
        ),
        (
            r"dangerouslySetInnerHTML",
            "dangerouslySetInnerHTML can introduce XSS",
            Severity::Warning,
            Some("Sanitize the HTML before rendering it"),
        ),
    ];

    specs
        .into_iter()
        .map(|(pattern, message, severity, fix)| {
            Rule::new(pattern, message, severity, fix).expect("Invalid built-in rule regex")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_console_log_is_a_warning() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan("const a = 1;\n  console.log('x');\n");

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[0].column, 3);
        assert_eq!(issues[0].severity(), Severity::Warning);
        assert_eq!(issues[0].rule.message, "console.log statement left in code");
        assert!(issues[0].rule.fix.is_some());
    }

    #[test]
    fn test_one_issue_per_rule_per_line() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan("console.log(1); console.log(2);");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_several_rules_can_hit_one_line() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan(r##"<a href="#" onClick={() => console.log(eval(x))}>"##);

        let messages: Vec<_> = issues.iter().map(|i| i.rule.message.as_str()).collect();
        assert_eq!(issues.len(), 3);
        assert!(messages.contains(&"console.log statement left in code"));
        assert!(messages.contains(&"Use of eval() is not allowed"));
        assert!(messages.contains(&"Placeholder link (href=\"#\")"));
        assert_eq!(error_count(&issues), 1);
    }

    #[test]
    fn test_clean_content_has_no_issues() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan("const [open, setOpen] = useState(false);\nexport default App;\n");
        assert!(issues.is_empty());
    }

    #[test]
    fn test_use_state_without_initial_value() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan("const [v, setV] = useState();");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule.message, "useState called without an initial value");
    }

    #[test]
    fn test_column_counts_characters() {
        let scanner = RuleScanner::new();
        let issues = scanner.scan("/* ção */ debugger;");
        // `debugger` must start the line to count
        assert!(issues.is_empty());

        let issues = scanner.scan("é; eval(code)");
        assert_eq!(issues[0].column, 4);
    }

    #[test]
    fn test_scan_is_idempotent() {
        let scanner = RuleScanner::new();
        let content = "debugger;\nconsole.log('a');\nconst x: any = 1;\n";
        assert_eq!(scanner.scan(content), scanner.scan(content));
    }

    #[test]
    fn test_check_file_missing_is_unreadable() {
        let temp_dir = TempDir::new().unwrap();
        let path = Utf8PathBuf::try_from(temp_dir.path().join("gone.tsx")).unwrap();

        let scanner = RuleScanner::new();
        assert!(matches!(
            scanner.check_file(&path),
            Err(ScanError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_custom_rules() {
        let rule = Rule::new(r"TODO", "todo left", Severity::Error, None).unwrap();
        let scanner = RuleScanner::with_rules(vec![rule]);
        let issues = scanner.scan("ok\n// TODO: later\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, 2);
        assert_eq!(issues[0].column, 4);
    }
}
