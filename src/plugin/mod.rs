//! Build extension contract.
//!
//! A plugin is a named object with optional lifecycle hooks. The host calls them in
//! this order for a build: [`BuildPlugin::build_start`], [`BuildPlugin::load`] once per
//! module, [`BuildPlugin::generate_bundle`] with the emitted manifest, then
//! [`BuildPlugin::build_end`]. In dev mode [`BuildPlugin::configure_server`] runs once
//! and may hand back a [`DevIntegration`] that the caller must stop on shutdown.
//!
//! Only [`PluginError::BuildFailed`] is meant to stop a build; every other problem a
//! plugin finds is reported and swallowed inside the plugin.

pub mod host;

pub use crate::config::ErrorPolicy;
pub use host::{BuildReport, PluginHost, discover_modules, walk_sources};

use crate::models::{OutputBundle, OutputOptions};
use crate::server::{DevIntegration, DevServer};
use camino::Utf8Path;
use thiserror::Error;

/// Errors a hook can return to the host
#[derive(Error, Debug)]
pub enum PluginError {
    /// Error-severity findings under a fatal policy
    #[error("Build failed: {errors} error(s) found in {file}")]
    BuildFailed { file: String, errors: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl PluginError {
    pub fn is_build_failure(&self) -> bool {
        matches!(self, PluginError::BuildFailed { .. })
    }
}

/// Lifecycle hooks a build extension may implement. Every hook defaults to a no-op.
pub trait BuildPlugin: Send {
    fn name(&self) -> &'static str;

    /// Called for every module id. `Ok(None)` passes the module through unchanged.
    fn load(&mut self, _id: &str) -> Result<Option<String>, PluginError> {
        Ok(None)
    }

    fn build_start(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    fn generate_bundle(
        &mut self,
        _options: &OutputOptions,
        _bundle: &OutputBundle,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn build_end(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Register socket handlers and start timers; must run inside a tokio runtime.
    fn configure_server(&mut self, _server: &DevServer) -> Option<DevIntegration> {
        None
    }
}

/// Whether `id` names a file with one of `extensions` (compared without the dot).
pub fn has_extension(id: &str, extensions: &[String]) -> bool {
    // Module ids may carry a query suffix such as `?import`
    let path = id.split('?').next().unwrap_or(id);
    Utf8Path::new(path)
        .extension()
        .is_some_and(|ext| extensions.iter().any(|e| e == ext))
}
