// Sitewatch - build-time checks and dev-time health tracking for web projects
//
// This is the library crate containing the plugins, their services and state.
// The binary crate (main.rs) provides the command-line host.

pub mod cli;
pub mod config;
pub mod logging;
pub mod models;
pub mod output;
pub mod plugin;
pub mod plugins;
pub mod server;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use config::{ConfigManager, ErrorPolicy, Settings};
pub use plugin::{BuildPlugin, PluginError, PluginHost};
pub use server::{DevIntegration, DevServer, DevSession};
pub use state::{SiteStateManager, StateChange};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
