use super::{BuildPlugin, PluginError};
use crate::models::{OutputBundle, OutputOptions};
use crate::server::{DevServer, DevSession};
use camino::{Utf8Path, Utf8PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// Directories never treated as site sources
const SKIPPED_DIRS: [&str; 5] = ["node_modules", "dist", "logs", ".git", "target"];

/// Outcome of a completed build run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub modules: usize,
    pub plugins: usize,
    pub elapsed_ms: u64,
}

/// Drives an ordered list of plugins through the build lifecycle.
#[derive(Default)]
pub struct PluginHost {
    plugins: Vec<Box<dyn BuildPlugin>>,
}

impl PluginHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_plugin(mut self, plugin: impl BuildPlugin + 'static) -> Self {
        self.plugins.push(Box::new(plugin));
        self
    }

    pub fn add(&mut self, plugin: Box<dyn BuildPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn plugin_names(&self) -> Vec<&'static str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run `load` for every module on every plugin, stopping at the first error.
    pub fn load_modules(&mut self, modules: &[String]) -> Result<(), PluginError> {
        for id in modules {
            for plugin in &mut self.plugins {
                if let Err(e) = plugin.load(id) {
                    tracing::error!("[{}] load failed for {}: {}", plugin.name(), id, e);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Full build lifecycle: start, load every module, emit the bundle, end.
    ///
    /// A load failure skips bundle generation; `build_end` still runs on every
    /// plugin before the error is returned.
    pub fn run_build(
        &mut self,
        modules: &[String],
        options: &OutputOptions,
        bundle: &OutputBundle,
    ) -> Result<BuildReport, PluginError> {
        let started = Instant::now();
        tracing::info!(
            "Build started: {} modules, plugins: {:?}",
            modules.len(),
            self.plugin_names()
        );

        for plugin in &mut self.plugins {
            plugin.build_start()?;
        }

        let loaded = self.load_modules(modules);
        if loaded.is_ok() {
            for plugin in &mut self.plugins {
                plugin.generate_bundle(options, bundle)?;
            }
        }

        for plugin in &mut self.plugins {
            if let Err(e) = plugin.build_end() {
                tracing::error!("[{}] build end failed: {}", plugin.name(), e);
            }
        }
        loaded?;

        let report = BuildReport {
            modules: modules.len(),
            plugins: self.plugins.len(),
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!("Build finished in {} ms", report.elapsed_ms);
        Ok(report)
    }

    /// Call every plugin's server hook and collect the integrations.
    pub fn start_dev(&mut self, server: &DevServer) -> DevSession {
        let mut session = DevSession::default();
        for plugin in &mut self.plugins {
            if let Some(integration) = plugin.configure_server(server) {
                tracing::info!("[{}] dev integration started", plugin.name());
                session.push(integration);
            }
        }
        session
    }
}

/// Module ids (absolute paths) of every source file under `root/src`.
///
/// Falls back to walking `root` itself when there is no `src` directory.
pub fn discover_modules(root: &Utf8Path) -> Vec<String> {
    let src = root.join("src");
    let base: &Utf8Path = if src.is_dir() { &src } else { root };

    walk_sources(base)
        .into_iter()
        .map(|path| path.to_string())
        .collect()
}

/// Every file under `base`, sorted, skipping dependency and build output directories.
pub fn walk_sources(base: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut files: Vec<Utf8PathBuf> = WalkDir::new(base)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
        })
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.into_path()).ok())
        .collect();
    files.sort();
    files
}
