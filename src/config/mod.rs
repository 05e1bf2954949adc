use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

/// File name of the optional project settings file.
pub const SETTINGS_FILE: &str = "sitewatch.yaml";

/// Environment prefix for overrides, e.g. `SITEWATCH_WS_URL`.
pub const ENV_PREFIX: &str = "SITEWATCH";

/// What a component does when it finds an error-severity problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Abort the current module load
    Fatal,
    /// Report only
    Advisory,
}

/// Effective settings for every extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Project root that globs and relative paths are resolved against
    pub root: Utf8PathBuf,
    /// Directory holding metrics, state and change log files
    pub log_dir: Utf8PathBuf,
    /// Endpoint the dev overlay connects to; the socket bridge binds its host:port
    pub ws_url: String,
    pub scanner: ScannerSettings,
    pub links: LinkSettings,
    pub performance: PerformanceSettings,
    pub tracker: TrackerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerSettings {
    pub extensions: Vec<String>,
    pub error_policy: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    pub extensions: Vec<String>,
    pub internal_routes: Vec<String>,
    pub admin_prefix: String,
    pub external_domains: Vec<String>,
    pub error_policy: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceSettings {
    pub history_cap: usize,
    pub broadcast_count: usize,
    pub memory_interval_ms: u64,
    pub chunk_size_limit: u64,
    pub chunk_import_limit: usize,
    pub slow_build_ms: u64,
    pub large_bundle_bytes: u64,
    pub chunk_count_limit: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    pub watch_globs: Vec<String>,
    pub ignore_globs: Vec<String>,
    pub change_cap: usize,
    pub health_window: usize,
    pub issue_cap: usize,
    pub health_interval_ms: u64,
    /// Skip the synthetic `created` events for files present at startup
    pub ignore_initial: bool,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            log_dir: Utf8PathBuf::from("logs"),
            ws_url: "ws://127.0.0.1:24680".to_string(),
            scanner: ScannerSettings::default(),
            links: LinkSettings::default(),
            performance: PerformanceSettings::default(),
            tracker: TrackerSettings::default(),
        }
    }
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            extensions: strings(&["ts", "tsx", "js", "jsx"]),
            error_policy: ErrorPolicy::Fatal,
        }
    }
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            extensions: strings(&["tsx", "jsx", "html"]),
            internal_routes: strings(&[
                "/",
                "/about",
                "/services",
                "/properties",
                "/pricing",
                "/contact",
                "/blog",
                "/faq",
                "/login",
                "/register",
                "/dashboard",
                "/privacy",
                "/terms",
            ]),
            admin_prefix: "/admin".to_string(),
            external_domains: strings(&[
                "wa.me",
                "api.whatsapp.com",
                "www.facebook.com",
                "facebook.com",
                "www.instagram.com",
                "instagram.com",
                "www.linkedin.com",
                "linkedin.com",
                "twitter.com",
                "x.com",
                "www.youtube.com",
                "youtube.com",
                "images.unsplash.com",
                "fonts.googleapis.com",
                "fonts.gstatic.com",
                "maps.google.com",
                "www.google.com",
            ]),
            error_policy: ErrorPolicy::Advisory,
        }
    }
}

impl Default for PerformanceSettings {
    fn default() -> Self {
        Self {
            history_cap: 100,
            broadcast_count: 10,
            memory_interval_ms: 5_000,
            chunk_size_limit: 500 * 1024,
            chunk_import_limit: 20,
            slow_build_ms: 10_000,
            large_bundle_bytes: 1024 * 1024,
            chunk_count_limit: 20,
        }
    }
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            watch_globs: strings(&[
                "src/**/*",
                "public/**/*",
                "*.{js,cjs,mjs,ts,json,html}",
            ]),
            ignore_globs: strings(&["node_modules/**", "dist/**", "logs/**", ".git/**"]),
            change_cap: 1000,
            health_window: 50,
            issue_cap: 10,
            health_interval_ms: 30_000,
            ignore_initial: false,
        }
    }
}

impl PerformanceSettings {
    pub fn memory_interval(&self) -> Duration {
        Duration::from_millis(self.memory_interval_ms)
    }
}

impl TrackerSettings {
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }
}

impl Settings {
    /// Absolute log directory (relative values are resolved against `root`).
    pub fn log_path(&self) -> Utf8PathBuf {
        if self.log_dir.is_absolute() {
            self.log_dir.clone()
        } else {
            self.root.join(&self.log_dir)
        }
    }

    /// `host:port` the socket bridge listens on, taken from `ws_url`.
    pub fn socket_addr(&self) -> Result<String> {
        let parsed = url::Url::parse(&self.ws_url)
            .with_context(|| format!("Invalid socket URL: {}", self.ws_url))?;
        let host = parsed
            .host_str()
            .with_context(|| format!("Socket URL has no host: {}", self.ws_url))?;
        let port = parsed
            .port_or_known_default()
            .with_context(|| format!("Socket URL has no port: {}", self.ws_url))?;
        Ok(format!("{}:{}", host, port))
    }
}

/// Loads and saves project settings.
///
/// Sources are layered lowest to highest: built-in defaults, `sitewatch.yaml` in the
/// project directory, then `SITEWATCH_*` environment variables (`__` separates nested
/// keys, e.g. `SITEWATCH_TRACKER__HEALTH_INTERVAL_MS`).
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a manager rooted at `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load the layered settings. A missing settings file is not an error.
    ///
    /// A relative `root` is resolved against the config directory.
    pub fn load_settings(&self) -> Result<Settings> {
        if !self.settings_path.exists() {
            tracing::debug!(
                "Settings file not found at {}, using defaults and environment",
                self.settings_path
            );
        }

        let merged = Config::builder()
            .add_source(
                Config::try_from(&Settings::default())
                    .context("Failed to build default settings")?,
            )
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        let mut settings: Settings = merged
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        if settings.root.is_relative() {
            settings.root = self.config_dir.join(&settings.root);
        }

        tracing::info!("Loaded settings (root={})", settings.root);
        Ok(settings)
    }

    /// Write `settings` to `sitewatch.yaml`.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_defaults_without_settings_file() {
        let (manager, _temp_dir) = create_test_config_manager();
        let settings = manager.load_settings().unwrap();

        assert_eq!(settings.performance.history_cap, 100);
        assert_eq!(settings.tracker.change_cap, 1000);
        assert_eq!(settings.scanner.error_policy, ErrorPolicy::Fatal);
        assert_eq!(settings.links.error_policy, ErrorPolicy::Advisory);
        assert_eq!(settings.root, manager.config_dir().join("."));
    }

    #[test]
    fn test_save_and_reload_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut settings = Settings::default();
        settings.performance.memory_interval_ms = 250;
        settings.links.admin_prefix = "/backoffice".to_string();
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.performance.memory_interval_ms, 250);
        assert_eq!(loaded.links.admin_prefix, "/backoffice");
        // Untouched sections keep their defaults
        assert_eq!(loaded.tracker.health_window, 50);
    }

    #[test]
    fn test_partial_yaml_overrides_only_named_keys() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.settings_path(),
            "tracker:\n  ignore_initial: true\n",
        )
        .unwrap();

        let loaded = manager.load_settings().unwrap();
        assert!(loaded.tracker.ignore_initial);
        assert_eq!(loaded.tracker.health_interval_ms, 30_000);
    }

    #[test]
    fn test_socket_addr_from_url() {
        let mut settings = Settings::default();
        assert_eq!(settings.socket_addr().unwrap(), "127.0.0.1:24680");

        settings.ws_url = "ws://localhost:3001/socket".to_string();
        assert_eq!(settings.socket_addr().unwrap(), "localhost:3001");

        settings.ws_url = "not a url".to_string();
        assert!(settings.socket_addr().is_err());
    }

    #[test]
    fn test_log_path_is_resolved_against_root() {
        let mut settings = Settings::default();
        settings.root = Utf8PathBuf::from("/srv/site");
        assert_eq!(settings.log_path(), Utf8PathBuf::from("/srv/site/logs"));

        settings.log_dir = Utf8PathBuf::from("/var/log/site");
        assert_eq!(settings.log_path(), Utf8PathBuf::from("/var/log/site"));
    }
}
