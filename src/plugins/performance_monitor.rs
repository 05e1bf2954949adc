use crate::config::PerformanceSettings;
use crate::models::{OutputBundle, OutputOptions, PerformanceMetric};
use crate::output;
use crate::plugin::{BuildPlugin, PluginError};
use crate::server::{DevIntegration, DevServer, spawn_interval};
use crate::services::bundle::recommendations;
use crate::services::{memory, summarize};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::fs;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// File name of the persisted metrics history
pub const METRICS_FILE: &str = "performance-metrics.json";

pub const GET_METRICS_EVENT: &str = "performance-monitor:get-metrics";
pub const METRICS_EVENT: &str = "performance-monitor:metrics";
pub const MEMORY_EVENT: &str = "performance-monitor:memory";

/// Records one [`PerformanceMetric`] per build.
///
/// History is newest first and capped; the whole list is rewritten to
/// `performance-metrics.json` after every build. Write failures are logged only.
pub struct PerformanceMonitorPlugin {
    settings: PerformanceSettings,
    metrics_path: Utf8PathBuf,
    history: Arc<RwLock<Vec<PerformanceMetric>>>,
    started: Option<Instant>,
}

impl PerformanceMonitorPlugin {
    /// Create the recorder, picking up any history already persisted in `log_dir`.
    pub fn new(log_dir: &Utf8Path, settings: PerformanceSettings) -> Self {
        let metrics_path = log_dir.join(METRICS_FILE);
        let mut history = load_history(&metrics_path);
        history.truncate(settings.history_cap);

        Self {
            settings,
            metrics_path,
            history: Arc::new(RwLock::new(history)),
            started: None,
        }
    }

    /// Newest-first copy of the recorded history
    pub fn history(&self) -> Vec<PerformanceMetric> {
        self.history
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn metrics_path(&self) -> &Utf8Path {
        &self.metrics_path
    }

    /// Build a metric for `bundle`, prepend it to the history and persist.
    pub fn record(&mut self, build_time: u64, bundle: &OutputBundle) -> PerformanceMetric {
        let summary = summarize(bundle, &self.settings);
        let metric = PerformanceMetric {
            timestamp: Utc::now(),
            build_time,
            bundle_size: summary.bundle_size,
            chunk_count: summary.chunk_count,
            asset_count: summary.asset_count,
            memory_usage: memory::sample(),
            warnings: summary.warnings,
        };

        let json = {
            let mut history = self.history.write().unwrap_or_else(PoisonError::into_inner);
            history.insert(0, metric.clone());
            history.truncate(self.settings.history_cap);
            serde_json::to_string_pretty(&*history)
        };

        match json {
            Ok(json) => self.persist(&json),
            Err(e) => tracing::error!("Failed to serialize performance metrics: {}", e),
        }
        metric
    }

    fn persist(&self, json: &str) {
        if let Some(parent) = self.metrics_path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                tracing::error!("Failed to create metrics directory {}: {}", parent, e);
                return;
            }
        }
        if let Err(e) = fs::write(&self.metrics_path, json) {
            tracing::error!("Failed to save performance metrics to {}: {}", self.metrics_path, e);
        }
    }
}

fn load_history(path: &Utf8Path) -> Vec<PerformanceMetric> {
    if !path.exists() {
        return Vec::new();
    }
    match fs::read_to_string(path).map(|json| serde_json::from_str(&json)) {
        Ok(Ok(history)) => history,
        Ok(Err(e)) => {
            tracing::warn!("Ignoring corrupt metrics history {}: {}", path, e);
            Vec::new()
        }
        Err(e) => {
            tracing::warn!("Failed to read metrics history {}: {}", path, e);
            Vec::new()
        }
    }
}

impl BuildPlugin for PerformanceMonitorPlugin {
    fn name(&self) -> &'static str {
        "performance-monitor"
    }

    fn build_start(&mut self) -> Result<(), PluginError> {
        self.started = Some(Instant::now());
        Ok(())
    }

    fn generate_bundle(
        &mut self,
        _options: &OutputOptions,
        bundle: &OutputBundle,
    ) -> Result<(), PluginError> {
        let build_time = self
            .started
            .take()
            .map(|started| started.elapsed().as_millis() as u64)
            .unwrap_or(0);

        let metric = self.record(build_time, bundle);
        output::print_performance_summary(&metric, &recommendations(&metric, &self.settings));
        Ok(())
    }

    fn configure_server(&mut self, server: &DevServer) -> Option<DevIntegration> {
        let history = self.history.clone();
        let count = self.settings.broadcast_count;
        let reply = server.clone();
        server.on(GET_METRICS_EVENT, move |_| {
            let recent: Vec<PerformanceMetric> = history
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .take(count)
                .cloned()
                .collect();
            reply.send(METRICS_EVENT, &recent);
        });

        let mut integration = DevIntegration::new(self.name());
        let broadcaster = server.clone();
        integration.add_task(spawn_interval(self.settings.memory_interval(), move || {
            broadcaster.send(MEMORY_EVENT, &memory::timestamped_sample());
        }));
        Some(integration)
    }
}
