//! Integration tests for the build lifecycle
//!
//! These tests verify:
//! - The rule scanner aborts a load on error matches and passes warnings
//! - Link classification boundary cases
//! - Link errors never abort the build
//! - Performance history stays capped with the newest entry first

use camino::{Utf8Path, Utf8PathBuf};
use sitewatch::config::{LinkSettings, PerformanceSettings, ScannerSettings, Settings};
use sitewatch::models::{OutputOptions, PerformanceMetric, Severity};
use sitewatch::plugin::{BuildPlugin, PluginError, PluginHost, discover_modules};
use sitewatch::plugins::{
    self, ErrorPreventionPlugin, LinkValidatorPlugin, PerformanceMonitorPlugin,
};
use sitewatch::services::{LinkKind, LinkValidator, RuleScanner, bundle_from_dir};
use std::fs;
use tempfile::TempDir;

fn create_test_site() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    fs::create_dir_all(root.join("src/pages")).unwrap();
    fs::create_dir_all(root.join("dist/assets")).unwrap();
    (temp_dir, root)
}

fn write(root: &Utf8Path, relative: &str, content: &str) -> String {
    let path = root.join(relative);
    fs::write(&path, content).unwrap();
    path.to_string()
}

#[test]
fn test_scanner_reports_one_issue_per_matching_rule_and_line() {
    let scanner = RuleScanner::new();
    let issues = scanner.scan(
        "const [a] = useState();\nconsole.log(a);\n<a href=\"#\">x</a>\nconst ok = 1;\n",
    );

    assert_eq!(issues.len(), 3);
    assert_eq!(issues.iter().map(|i| i.line).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(issues.iter().all(|i| i.severity() == Severity::Warning));

    // Same content twice yields the same findings
    assert_eq!(
        scanner.scan("console.log(1);\ndebugger;\n"),
        scanner.scan("console.log(1);\ndebugger;\n")
    );
}

#[test]
fn test_load_hook_fails_only_on_errors() {
    let (_temp_dir, root) = create_test_site();
    let warn_only = write(&root, "src/Warn.tsx", "console.log('x');\n");
    let with_error = write(&root, "src/Bad.ts", "function f() {\n  debugger;\n}\n");

    let mut plugin = ErrorPreventionPlugin::new(ScannerSettings::default());
    assert!(plugin.load(&warn_only).unwrap().is_none());

    let err = plugin.load(&with_error).unwrap_err();
    assert!(err.is_build_failure());
    assert!(err.to_string().contains("Bad.ts"));
    assert!(err.to_string().contains("1 error(s)"));
}

#[test]
fn test_link_boundary_cases() {
    let validator = LinkValidator::from_settings(&LinkSettings::default());

    assert_eq!(validator.classify(LinkKind::Href, "/"), None);
    assert_eq!(validator.classify(LinkKind::Href, "https://wa.me/123"), None);

    let (severity, message) = validator.classify(LinkKind::Href, "/unknown-page").unwrap();
    assert_eq!(severity, Severity::Error);
    assert!(message.contains("Internal route not found"));

    let (severity, _) = validator
        .classify(LinkKind::Href, "https://evil.example.com")
        .unwrap();
    assert_eq!(severity, Severity::Warning);

    let (severity, message) = validator.classify(LinkKind::Href, "not a url").unwrap();
    assert_eq!(severity, Severity::Error);
    assert_eq!(message, "Invalid URL format");

    let (severity, _) = validator.classify(LinkKind::Href, "#").unwrap();
    assert_eq!(severity, Severity::Warning);
}

#[test]
fn test_link_errors_do_not_abort_build() {
    let (_temp_dir, root) = create_test_site();
    let page = write(
        &root,
        "src/pages/Home.tsx",
        "<a href=\"/nowhere\">broken</a>\n<img src=\"https://evil.example.com/a.png\" />\n",
    );

    let mut host = PluginHost::new().with_plugin(LinkValidatorPlugin::new(
        root.clone(),
        LinkSettings::default(),
    ));
    let report = host
        .run_build(&[page], &OutputOptions::default(), &Default::default())
        .unwrap();
    assert_eq!(report.modules, 1);
}

#[test]
fn test_check_host_stops_at_first_fatal_module() {
    let (_temp_dir, root) = create_test_site();
    write(&root, "src/a.ts", "eval('1');\n");
    write(&root, "src/b.ts", "const b = 2;\n");

    let mut settings = Settings::default();
    settings.root = root.clone();

    let modules = discover_modules(&root);
    assert_eq!(modules.len(), 2);

    let mut host = plugins::check_host(&settings);
    match host.load_modules(&modules) {
        Err(PluginError::BuildFailed { file, errors }) => {
            assert!(file.ends_with("a.ts"));
            assert_eq!(errors, 1);
        }
        other => panic!("Expected BuildFailed, got {:?}", other),
    }
}

#[test]
fn test_standard_build_records_metric_from_output_dir() {
    let (_temp_dir, root) = create_test_site();
    write(&root, "src/main.tsx", "import App from './App';\n");
    write(
        &root,
        "dist/assets/index.js",
        "import './vendor.js';\nexport default 1;\n",
    );
    write(&root, "dist/assets/vendor.js", "export const v = 1;\n");
    write(&root, "dist/index.html", "<div id=\"root\"></div>\n");

    let mut settings = Settings::default();
    settings.root = root.clone();

    let bundle = bundle_from_dir(&root.join("dist")).unwrap();
    let modules = discover_modules(&root);

    let mut host = plugins::standard_host(&settings).unwrap();
    host.run_build(&modules, &OutputOptions::default(), &bundle)
        .unwrap();

    let persisted: Vec<PerformanceMetric> = serde_json::from_str(
        &fs::read_to_string(root.join("logs/performance-metrics.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].chunk_count, 2);
    assert_eq!(persisted[0].asset_count, 1);

    // The tracker stamped and persisted its state at build start
    assert!(root.join("logs/website-state.json").exists());
}

#[test]
fn test_performance_history_is_capped_newest_first() {
    let (_temp_dir, root) = create_test_site();
    let log_dir = root.join("logs");
    let mut plugin = PerformanceMonitorPlugin::new(&log_dir, PerformanceSettings::default());
    let bundle = bundle_from_dir(&root.join("dist")).unwrap();

    for build in 0..105u64 {
        plugin.record(build, &bundle);
        let history = plugin.history();
        assert!(history.len() <= 100);
        assert_eq!(history[0].build_time, build);
    }

    let persisted: Vec<PerformanceMetric> =
        serde_json::from_str(&fs::read_to_string(plugin.metrics_path()).unwrap()).unwrap();
    assert_eq!(persisted.len(), 100);
    assert_eq!(persisted[0].build_time, 104);
    assert_eq!(persisted[99].build_time, 5);
}
