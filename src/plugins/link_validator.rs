use crate::config::{ErrorPolicy, LinkSettings};
use crate::models::LinkIssue;
use crate::output;
use crate::plugin::{BuildPlugin, PluginError, has_extension, walk_sources};
use crate::server::{DevIntegration, DevServer, run_blocking};
use crate::services::LinkValidator;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

pub const CHECK_EVENT: &str = "link-validator:check";
pub const RESULTS_EVENT: &str = "link-validator:results";

/// Validates `href`/`src` references in markup-bearing modules.
///
/// The default policy is advisory: link errors are printed with a notice but the
/// load always succeeds.
pub struct LinkValidatorPlugin {
    validator: LinkValidator,
    settings: LinkSettings,
    root: Utf8PathBuf,
}

impl LinkValidatorPlugin {
    pub fn new(root: impl Into<Utf8PathBuf>, settings: LinkSettings) -> Self {
        Self {
            validator: LinkValidator::from_settings(&settings),
            settings,
            root: root.into(),
        }
    }

    /// Validate one file; unreadable files yield no issues.
    pub fn check_file(&self, path: &Utf8Path) -> Vec<LinkIssue> {
        match fs::read_to_string(path) {
            Ok(content) => self.validator.validate(path.as_str(), &content),
            Err(e) => {
                tracing::debug!("Skipping unreadable file {}: {}", path, e);
                Vec::new()
            }
        }
    }

    /// Validate every markup file under the project root.
    pub fn check_tree(&self) -> Vec<LinkIssue> {
        check_tree(&self.validator, &self.root, &self.settings.extensions)
    }
}

fn check_tree(validator: &LinkValidator, root: &Utf8Path, extensions: &[String]) -> Vec<LinkIssue> {
    walk_sources(root)
        .into_iter()
        .filter(|path| has_extension(path.as_str(), extensions))
        .flat_map(|path| {
            let label = path.strip_prefix(root).unwrap_or(&path).to_string();
            match fs::read_to_string(&path) {
                Ok(content) => validator.validate(&label, &content),
                Err(_) => Vec::new(),
            }
        })
        .collect()
}

impl BuildPlugin for LinkValidatorPlugin {
    fn name(&self) -> &'static str {
        "link-validator"
    }

    fn load(&mut self, id: &str) -> Result<Option<String>, PluginError> {
        if !has_extension(id, &self.settings.extensions) {
            return Ok(None);
        }

        let path = Utf8Path::new(id.split('?').next().unwrap_or(id));
        let issues = self.check_file(path);
        if issues.is_empty() {
            return Ok(None);
        }
        output::print_link_report(&issues);

        let errors = issues.iter().filter(|i| i.severity.is_error()).count();
        if errors > 0 {
            match self.settings.error_policy {
                ErrorPolicy::Fatal => {
                    return Err(PluginError::BuildFailed {
                        file: path.to_string(),
                        errors,
                    });
                }
                ErrorPolicy::Advisory => {
                    tracing::warn!("{} link error(s) in {} (advisory)", errors, path);
                }
            }
        }
        Ok(None)
    }

    fn configure_server(&mut self, server: &DevServer) -> Option<DevIntegration> {
        let validator = self.validator.clone();
        let root = self.root.clone();
        let extensions = self.settings.extensions.clone();
        let reply = server.clone();

        server.on(CHECK_EVENT, move |_| {
            let validator = validator.clone();
            let root = root.clone();
            let extensions = extensions.clone();
            let reply = reply.clone();
            run_blocking(move || {
                let issues = check_tree(&validator, &root, &extensions);
                tracing::info!("Link check found {} issue(s)", issues.len());
                reply.send(RESULTS_EVENT, &issues);
            });
        });

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use serde_json::Value;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio::time::timeout;

    fn site() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("src/pages")).unwrap();
        fs::write(
            root.join("src/pages/Home.tsx"),
            "<a href=\"/unknown-page\">x</a>\n<a href=\"https://evil.example.com\">y</a>\n",
        )
        .unwrap();
        fs::write(root.join("src/pages/About.tsx"), "<a href=\"/about\">ok</a>\n").unwrap();
        (dir, root)
    }

    #[test]
    fn test_link_errors_are_advisory() {
        let (_dir, root) = site();
        let mut plugin = LinkValidatorPlugin::new(root.clone(), LinkSettings::default());

        let id = root.join("src/pages/Home.tsx");
        assert!(plugin.load(id.as_str()).unwrap().is_none());

        let issues = plugin.check_file(&id);
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[1].severity, Severity::Warning);
    }

    #[test]
    fn test_fatal_policy_fails_on_link_error() {
        let (_dir, root) = site();
        let settings = LinkSettings {
            error_policy: ErrorPolicy::Fatal,
            ..LinkSettings::default()
        };
        let mut plugin = LinkValidatorPlugin::new(root.clone(), settings);
        let err = plugin.load(root.join("src/pages/Home.tsx").as_str()).unwrap_err();
        assert!(err.is_build_failure());
    }

    #[test]
    fn test_check_tree_labels_relative_paths() {
        let (_dir, root) = site();
        let plugin = LinkValidatorPlugin::new(root.clone(), LinkSettings::default());
        let issues = plugin.check_tree();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.file == "src/pages/Home.tsx"));
    }

    #[tokio::test]
    async fn test_socket_check_replies_with_tree_results() {
        let (_dir, root) = site();
        let server = DevServer::new();
        let mut plugin = LinkValidatorPlugin::new(root.clone(), LinkSettings::default());
        plugin.configure_server(&server);

        let mut rx = server.subscribe();
        assert_eq!(server.dispatch(CHECK_EVENT, Value::Null), 1);

        let message = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("Timeout waiting for results")
            .unwrap();
        assert_eq!(message.event, RESULTS_EVENT);
        assert_eq!(message.payload.as_array().unwrap().len(), 2);
    }
}
