//! The four build extensions.
//!
//! - [`ErrorPreventionPlugin`]: rule scan on module load, fatal on errors
//! - [`LinkValidatorPlugin`]: `href`/`src` checks on markup modules, advisory
//! - [`PerformanceMonitorPlugin`]: per-build metrics plus a live memory feed
//! - [`WebsiteTrackerPlugin`]: file watcher, change history and health score
//!
//! Plugins never call each other; each one only reacts to host hooks and socket events.

pub mod error_prevention;
pub mod link_validator;
pub mod performance_monitor;
pub mod website_tracker;

pub use error_prevention::ErrorPreventionPlugin;
pub use link_validator::LinkValidatorPlugin;
pub use performance_monitor::PerformanceMonitorPlugin;
pub use website_tracker::{PathFilter, WebsiteTrackerPlugin};

use crate::config::Settings;
use crate::plugin::PluginHost;
use anyhow::Result;

/// Host with the two source checkers only, for one-off checks.
pub fn check_host(settings: &Settings) -> PluginHost {
    PluginHost::new()
        .with_plugin(ErrorPreventionPlugin::new(settings.scanner.clone()))
        .with_plugin(LinkValidatorPlugin::new(
            settings.root.clone(),
            settings.links.clone(),
        ))
}

/// Host with every plugin, in registration order.
pub fn standard_host(settings: &Settings) -> Result<PluginHost> {
    let log_dir = settings.log_path();
    let mut host = check_host(settings);
    host.add(Box::new(PerformanceMonitorPlugin::new(
        &log_dir,
        settings.performance.clone(),
    )));
    host.add(Box::new(WebsiteTrackerPlugin::new(settings)?));
    Ok(host)
}
