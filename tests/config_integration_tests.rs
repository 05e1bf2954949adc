//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Defaults when no settings file exists
//! - Saving and reloading a full settings document
//! - Partial YAML documents layered over defaults
//! - Settings flowing into the plugins that use them

use camino::Utf8PathBuf;
use sitewatch::config::{ErrorPolicy, SETTINGS_FILE};
use sitewatch::plugin::BuildPlugin;
use sitewatch::plugins::{ErrorPreventionPlugin, LinkValidatorPlugin};
use sitewatch::{ConfigManager, Settings};
use std::fs;
use tempfile::TempDir;

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager_creates_directory() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("site").join("config");
    let manager = ConfigManager::new(&nested).unwrap();

    assert!(nested.is_dir());
    assert_eq!(manager.config_dir(), &nested);
    assert_eq!(manager.settings_path(), nested.join(SETTINGS_FILE));
}

#[test]
fn test_load_defaults() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    let settings = manager.load_settings().unwrap();

    assert_eq!(settings.log_dir, Utf8PathBuf::from("logs"));
    assert_eq!(settings.performance.memory_interval_ms, 5_000);
    assert_eq!(settings.tracker.health_interval_ms, 30_000);
    assert!(settings.links.internal_routes.contains(&"/contact".to_string()));
    assert!(settings.links.external_domains.contains(&"wa.me".to_string()));
}

#[test]
fn test_save_and_reload_full_settings() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let mut settings = Settings::default();
    settings.root = config_path.clone();
    settings.scanner.error_policy = ErrorPolicy::Advisory;
    settings.links.internal_routes.push("/careers".to_string());
    settings.tracker.change_cap = 200;
    manager.save_settings(&settings).unwrap();

    let yaml = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(yaml.contains("error_policy: advisory"));

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded, settings);
}

#[test]
fn test_relative_root_and_log_dir() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        manager.settings_path(),
        "root: web\nlog_dir: build-logs\nws_url: ws://localhost:4000\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.root, config_path.join("web"));
    assert_eq!(settings.log_path(), config_path.join("web").join("build-logs"));
    assert_eq!(settings.socket_addr().unwrap(), "localhost:4000");
}

#[test]
fn test_invalid_yaml_is_an_error() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(manager.settings_path(), "tracker: [unclosed\n").unwrap();

    assert!(manager.load_settings().is_err());
}

#[test]
fn test_policies_from_settings_reach_plugins() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    fs::write(
        manager.settings_path(),
        "scanner:\n  error_policy: advisory\nlinks:\n  error_policy: fatal\n",
    )
    .unwrap();
    let settings = manager.load_settings().unwrap();

    let module = config_path.join("Page.tsx");
    fs::write(&module, "debugger\n<a href=\"/missing\">x</a>\n").unwrap();

    let mut scanner = ErrorPreventionPlugin::new(settings.scanner.clone());
    assert!(scanner.load(module.as_str()).is_ok());

    let mut links = LinkValidatorPlugin::new(settings.root.clone(), settings.links.clone());
    assert!(links.load(module.as_str()).unwrap_err().is_build_failure());
}
