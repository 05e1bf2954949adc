use crate::config::{Settings, TrackerSettings};
use crate::models::{ChangeAction, ChangeLog, Health};
use crate::output;
use crate::plugin::{BuildPlugin, PluginError};
use crate::server::{DevIntegration, DevServer, spawn_interval};
use crate::services::file_analysis::{
    classify_path, extract_dependencies, fingerprint, is_asset_path, run_heuristics,
};
use crate::state::{FileStateStore, SiteStateManager, StateStore};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::fs;
use std::sync::Arc;
use tokio::sync::mpsc;
use walkdir::WalkDir;

pub const GET_STATE_EVENT: &str = "website-tracker:get-state";
pub const STATE_EVENT: &str = "website-tracker:state";
pub const HEALTH_EVENT: &str = "website-tracker:health";

/// Root-relative include/exclude globs for watched paths.
///
/// `*` never crosses a `/`, so `*.json` only matches files at the root.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: GlobSet,
    ignore: GlobSet,
}

impl PathFilter {
    pub fn new(include: &[String], ignore: &[String]) -> Result<Self> {
        Ok(Self {
            include: build_set(include)?,
            ignore: build_set(ignore)?,
        })
    }

    pub fn from_settings(settings: &TrackerSettings) -> Result<Self> {
        Self::new(&settings.watch_globs, &settings.ignore_globs)
    }

    /// Whether a `/`-separated, root-relative path should be tracked
    pub fn matches(&self, relative: &str) -> bool {
        self.include.is_match(relative) && !self.ignore.is_match(relative)
    }
}

fn build_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .with_context(|| format!("Invalid glob pattern: {}", pattern))?;
        builder.add(glob);
    }
    builder.build().context("Failed to build glob set")
}

/// Analyze one watcher event into a change entry.
///
/// Deletions carry only type, action and path. For creations and modifications the
/// file is re-read; an unreadable file still yields an entry without content fields.
pub fn analyze_change(root: &Utf8Path, relative: &str, action: ChangeAction) -> ChangeLog {
    let mut change = ChangeLog::new(classify_path(relative), action, relative);
    if action == ChangeAction::Deleted {
        return change;
    }

    let bytes = match fs::read(root.join(relative)) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!("Could not read {} for analysis: {}", relative, e);
            return change;
        }
    };
    let content = String::from_utf8_lossy(&bytes);
    let diagnostics = run_heuristics(&content);

    change.size = Some(bytes.len() as u64);
    change.checksum = Some(fingerprint(&content));
    change.dependencies = Some(extract_dependencies(&content));
    change.errors = Some(diagnostics.errors);
    change.warnings = Some(diagnostics.warnings);
    change
}

/// Analyze and record one event against `manager`.
pub fn process_change(
    root: &Utf8Path,
    manager: &SiteStateManager,
    relative: &str,
    action: ChangeAction,
) -> Health {
    let change = analyze_change(root, relative, action);
    manager.record_change(change, is_asset_path(relative))
}

/// Record every matching file under `root` as created.
fn initial_scan(root: &Utf8Path, manager: &SiteStateManager, filter: &PathFilter) {
    let mut scanned = 0usize;
    for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        let Some(relative) = relative_path(root, &path) else {
            continue;
        };
        if filter.matches(&relative) {
            process_change(root, manager, &relative, ChangeAction::Created);
            scanned += 1;
        }
    }
    tracing::debug!("Initial scan recorded {} file(s)", scanned);
}

/// Apply one watcher event to every matching path it names.
fn apply_event(
    root: &Utf8Path,
    manager: &SiteStateManager,
    filter: &PathFilter,
    paths: Vec<std::path::PathBuf>,
    action: ChangeAction,
) {
    for path in paths {
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        if action != ChangeAction::Deleted && path.is_dir() {
            continue;
        }
        let Some(relative) = relative_path(root, &path) else {
            continue;
        };
        if filter.matches(&relative) {
            process_change(root, manager, &relative, action);
        }
    }
}

/// Root-relative `/`-separated form of `path`, if it lies under `root`.
fn relative_path(root: &Utf8Path, path: &Utf8Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_str())
        .collect::<Vec<_>>()
        .join("/");
    (!joined.is_empty()).then_some(joined)
}

/// Map a notify event kind onto a change action; `None` for events that don't count.
fn action_for(kind: &EventKind) -> Option<ChangeAction> {
    match kind {
        EventKind::Create(_) => Some(ChangeAction::Created),
        EventKind::Remove(_) => Some(ChangeAction::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => Some(ChangeAction::Deleted),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => Some(ChangeAction::Created),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeAction::Modified),
        _ => None,
    }
}

/// Maintains the site state across the life of the dev server.
pub struct WebsiteTrackerPlugin {
    root: Utf8PathBuf,
    manager: SiteStateManager,
    filter: PathFilter,
}

impl WebsiteTrackerPlugin {
    /// Tracker persisting under the settings' log directory (created if missing).
    pub fn new(settings: &Settings) -> Result<Self> {
        let store = FileStateStore::new(&settings.log_path())
            .context("Failed to prepare tracker log directory")?;
        Self::with_store(settings.root.clone(), Arc::new(store), settings.tracker.clone())
    }

    /// Tracker over an explicit store.
    pub fn with_store(
        root: Utf8PathBuf,
        store: Arc<dyn StateStore>,
        settings: TrackerSettings,
    ) -> Result<Self> {
        let filter = PathFilter::from_settings(&settings)?;
        Ok(Self {
            root,
            manager: SiteStateManager::load(store, settings),
            filter,
        })
    }

    pub fn manager(&self) -> &SiteStateManager {
        &self.manager
    }

    pub fn filter(&self) -> &PathFilter {
        &self.filter
    }

    /// Record a change to `relative` (a `/`-separated path under the root).
    pub fn handle_path_event(&self, relative: &str, action: ChangeAction) -> Health {
        process_change(&self.root, &self.manager, relative, action)
    }

    fn start_watcher(
        &self,
        root: &Utf8Path,
        integration: &mut DevIntegration,
    ) -> Result<mpsc::UnboundedReceiver<Event>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    // Receiver is gone once the integration stops
                    let _ = tx.send(event);
                }
                Err(e) => tracing::warn!("File watcher error: {}", e),
            }
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(root.as_std_path(), RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", root))?;
        integration.set_watcher(watcher);
        Ok(rx)
    }
}

impl BuildPlugin for WebsiteTrackerPlugin {
    fn name(&self) -> &'static str {
        "website-tracker"
    }

    fn build_start(&mut self) -> Result<(), PluginError> {
        self.manager.stamp_build();
        Ok(())
    }

    fn build_end(&mut self) -> Result<(), PluginError> {
        let health = self.manager.health();
        tracing::info!("Website health: {}/100", health.score);
        output::print_health(&health);
        Ok(())
    }

    fn configure_server(&mut self, server: &DevServer) -> Option<DevIntegration> {
        let mut integration = DevIntegration::new(self.name());

        let manager = self.manager.clone();
        let reply = server.clone();
        server.on(GET_STATE_EVENT, move |_| {
            reply.send(STATE_EVENT, &manager.snapshot());
        });

        let manager = self.manager.clone();
        let broadcaster = server.clone();
        integration.add_task(spawn_interval(
            self.manager.limits().health_interval(),
            move || {
                broadcaster.send(HEALTH_EVENT, &manager.health());
            },
        ));

        // notify reports canonical paths, so compare against the canonical root
        let root = self
            .root
            .canonicalize_utf8()
            .unwrap_or_else(|_| self.root.clone());

        let mut events = match self.start_watcher(&root, &mut integration) {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("File tracking disabled: {:#}", e);
                return Some(integration);
            }
        };

        let manager = self.manager.clone();
        let filter = self.filter.clone();
        let scan_initial = !manager.limits().ignore_initial;
        integration.spawn(async move {
            // File reads and the tree walk stay on the blocking pool, one at a time
            if scan_initial {
                let (root, manager, filter) = (root.clone(), manager.clone(), filter.clone());
                if let Err(e) =
                    tokio::task::spawn_blocking(move || initial_scan(&root, &manager, &filter)).await
                {
                    tracing::error!("Initial scan failed: {}", e);
                }
            }
            tracing::info!("Watching {} for changes", root);

            while let Some(event) = events.recv().await {
                let Some(action) = action_for(&event.kind) else {
                    continue;
                };
                let (root, manager, filter) = (root.clone(), manager.clone(), filter.clone());
                let applied = tokio::task::spawn_blocking(move || {
                    apply_event(&root, &manager, &filter, event.paths, action)
                })
                .await;
                if let Err(e) = applied {
                    tracing::error!("Failed to apply file event: {}", e);
                }
            }
        });

        Some(integration)
    }
}
