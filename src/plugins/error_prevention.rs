use crate::config::{ErrorPolicy, ScannerSettings};
use crate::models::Issue;
use crate::output;
use crate::plugin::{BuildPlugin, PluginError, has_extension};
use crate::server::{DevIntegration, DevServer};
use crate::services::rule_scanner::error_count;
use crate::services::{RuleScanner, ScanError};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CHECK_EVENT: &str = "error-prevention:check";
pub const RESULTS_EVENT: &str = "error-prevention:results";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    file_path: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckResults {
    file_path: String,
    issues: Vec<Issue>,
}

/// Scans every loaded source module against the rule set.
///
/// Under [`ErrorPolicy::Fatal`] an error-severity match fails the load; warnings are
/// only printed. Files that cannot be read are skipped.
pub struct ErrorPreventionPlugin {
    scanner: RuleScanner,
    settings: ScannerSettings,
}

impl ErrorPreventionPlugin {
    pub fn new(settings: ScannerSettings) -> Self {
        Self::with_scanner(RuleScanner::new(), settings)
    }

    pub fn with_scanner(scanner: RuleScanner, settings: ScannerSettings) -> Self {
        Self { scanner, settings }
    }

    /// Re-read the module from disk and apply the error policy to the findings.
    pub fn check_module(&self, id: &str) -> Result<Vec<Issue>, PluginError> {
        let path = Utf8Path::new(id.split('?').next().unwrap_or(id));
        let issues = match self.scanner.check_file(path) {
            Ok(issues) => issues,
            Err(ScanError::Unreadable { path, source }) => {
                tracing::debug!("Skipping unreadable module {}: {}", path, source);
                return Ok(Vec::new());
            }
        };

        if issues.is_empty() {
            return Ok(issues);
        }
        output::print_scan_report(path.as_str(), &issues);

        let errors = error_count(&issues);
        if errors > 0 {
            match self.settings.error_policy {
                ErrorPolicy::Fatal => {
                    return Err(PluginError::BuildFailed {
                        file: path.to_string(),
                        errors,
                    });
                }
                ErrorPolicy::Advisory => {
                    tracing::warn!("{} error(s) in {} (advisory)", errors, path);
                }
            }
        }
        Ok(issues)
    }
}

impl BuildPlugin for ErrorPreventionPlugin {
    fn name(&self) -> &'static str {
        "error-prevention"
    }

    fn load(&mut self, id: &str) -> Result<Option<String>, PluginError> {
        if has_extension(id, &self.settings.extensions) {
            self.check_module(id)?;
        }
        Ok(None)
    }

    fn configure_server(&mut self, server: &DevServer) -> Option<DevIntegration> {
        let scanner = self.scanner.clone();
        let reply = server.clone();

        // Live checks are advisory whatever the build policy is
        server.on(CHECK_EVENT, move |payload: Value| {
            let request: CheckRequest = match serde_json::from_value(payload) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("Malformed {} payload: {}", CHECK_EVENT, e);
                    return;
                }
            };

            let issues = scanner.scan(&request.content);
            reply.send(
                RESULTS_EVENT,
                &CheckResults {
                    file_path: request.file_path,
                    issues,
                },
            );
        });

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serde_json::json;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn write_module(dir: &TempDir, name: &str, content: &str) -> String {
        let path = Utf8PathBuf::try_from(dir.path().join(name)).unwrap();
        fs::write(&path, content).unwrap();
        path.to_string()
    }

    #[test]
    fn test_error_match_fails_load() {
        let dir = TempDir::new().unwrap();
        let id = write_module(&dir, "bad.ts", "const x = 1;\ndebugger;\n");

        let mut plugin = ErrorPreventionPlugin::new(ScannerSettings::default());
        let err = plugin.load(&id).unwrap_err();
        match err {
            PluginError::BuildFailed { file, errors } => {
                assert_eq!(file, id);
                assert_eq!(errors, 1);
            }
            other => panic!("Expected BuildFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_warnings_pass_through() {
        let dir = TempDir::new().unwrap();
        let id = write_module(&dir, "warn.tsx", "console.log('x');\nconst [a] = useState();\n");

        let mut plugin = ErrorPreventionPlugin::new(ScannerSettings::default());
        assert!(plugin.load(&id).unwrap().is_none());
        assert_eq!(plugin.check_module(&id).unwrap().len(), 2);
    }

    #[test]
    fn test_advisory_policy_never_fails() {
        let dir = TempDir::new().unwrap();
        let id = write_module(&dir, "bad.js", "eval('1')\n");

        let settings = ScannerSettings {
            error_policy: ErrorPolicy::Advisory,
            ..ScannerSettings::default()
        };
        let mut plugin = ErrorPreventionPlugin::new(settings);
        assert!(plugin.load(&id).is_ok());
    }

    #[test]
    fn test_missing_file_and_foreign_extension_are_skipped() {
        let dir = TempDir::new().unwrap();
        let mut plugin = ErrorPreventionPlugin::new(ScannerSettings::default());

        let gone = dir.path().join("gone.ts").to_string_lossy().to_string();
        assert!(plugin.load(&gone).unwrap().is_none());

        let css = write_module(&dir, "style.css", "debugger\n");
        assert!(plugin.load(&css).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_live_check_replies_with_issues() {
        let server = DevServer::new();
        let mut plugin = ErrorPreventionPlugin::new(ScannerSettings::default());
        assert!(plugin.configure_server(&server).is_none());

        let mut rx = server.subscribe();
        server.dispatch(
            CHECK_EVENT,
            json!({"filePath": "src/App.tsx", "content": "debugger;\n"}),
        );

        let message = timeout(Duration::from_millis(200), rx.recv())
            .await
            .expect("Timeout waiting for results")
            .unwrap();
        assert_eq!(message.event, RESULTS_EVENT);
        assert_eq!(message.payload["filePath"], "src/App.tsx");
        assert_eq!(message.payload["issues"][0]["rule"]["severity"], "error");
        assert_eq!(message.payload["issues"][0]["line"], 1);
    }
}
