// State management module
//
// Owns the tracker's WebsiteState, persists it through a pluggable StateStore and
// emits change events for socket subscribers and tests.

use crate::config::TrackerSettings;
use crate::models::{ChangeAction, ChangeLog, Health, WebsiteState};
use crate::services::file_analysis::compute_health;
use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::broadcast;

/// File name of the persisted tracker state
pub const STATE_FILE: &str = "website-state.json";

/// File name of the append-only change log
pub const CHANGE_LOG_FILE: &str = "changes.log";

/// Errors raised by a [`StateStore`]
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Backing storage for the tracker state.
///
/// `load` returns `None` when nothing was persisted yet. Writes are whole-document
/// overwrites; `append_log` adds one line to the change log.
#[cfg_attr(test, mockall::automock)]
pub trait StateStore: Send + Sync {
    fn load(&self) -> Result<Option<String>, StoreError>;
    fn persist(&self, json: &str) -> Result<(), StoreError>;
    fn append_log(&self, line: &str) -> Result<(), StoreError>;
}

/// Filesystem store under the log directory.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    state_path: Utf8PathBuf,
    log_path: Utf8PathBuf,
}

impl FileStateStore {
    /// Create the store, creating `log_dir` recursively if missing.
    pub fn new(log_dir: &Utf8Path) -> Result<Self, StoreError> {
        fs::create_dir_all(log_dir).map_err(|source| StoreError::Io {
            path: log_dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            state_path: log_dir.join(STATE_FILE),
            log_path: log_dir.join(CHANGE_LOG_FILE),
        })
    }

    pub fn state_path(&self) -> &Utf8Path {
        &self.state_path
    }

    pub fn log_path(&self) -> &Utf8Path {
        &self.log_path
    }
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        if !self.state_path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&self.state_path)
            .map(Some)
            .map_err(|source| StoreError::Io {
                path: self.state_path.clone(),
                source,
            })
    }

    fn persist(&self, json: &str) -> Result<(), StoreError> {
        fs::write(&self.state_path, json).map_err(|source| StoreError::Io {
            path: self.state_path.clone(),
            source,
        })
    }

    fn append_log(&self, line: &str) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.log_path.clone(),
            source,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .map_err(io_err)?;
        writeln!(file, "{}", line).map_err(io_err)
    }
}

/// In-memory store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    document: Mutex<Option<String>>,
    lines: Mutex<Vec<String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already persisted document
    pub fn with_document(json: impl Into<String>) -> Self {
        Self {
            document: Mutex::new(Some(json.into())),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn document(&self) -> Option<String> {
        self.document
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.document())
    }

    fn persist(&self, json: &str) -> Result<(), StoreError> {
        *self.document.lock().unwrap_or_else(PoisonError::into_inner) = Some(json.to_string());
        Ok(())
    }

    fn append_log(&self, line: &str) -> Result<(), StoreError> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
        Ok(())
    }
}

/// Events emitted when the tracker state changes
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A watcher event was recorded
    ChangeRecorded {
        path: String,
        action: ChangeAction,
        score: u32,
    },

    /// The health score moved
    HealthUpdated { score: u32 },

    /// A build started and `lastUpdate` was stamped
    BuildStamped,
}

/// Owner of the tracker's [`WebsiteState`].
///
/// Every mutation goes through this manager and is immediately followed by a
/// full-state write to the store, so the in-memory list and the persisted document
/// never drift apart. Store failures are logged and otherwise ignored.
#[derive(Clone)]
pub struct SiteStateManager {
    state: Arc<RwLock<WebsiteState>>,
    store: Arc<dyn StateStore>,
    limits: TrackerSettings,
    state_tx: broadcast::Sender<StateChange>,
}

impl SiteStateManager {
    /// Load prior state from `store`, falling back to a fresh default when it is
    /// missing, unreadable or corrupt.
    pub fn load(store: Arc<dyn StateStore>, limits: TrackerSettings) -> Self {
        let state = match store.load() {
            Ok(Some(json)) => match serde_json::from_str::<WebsiteState>(&json) {
                Ok(state) => {
                    tracing::info!(
                        "Loaded tracker state: {} changes, health {}",
                        state.changes.len(),
                        state.health.score
                    );
                    state
                }
                Err(e) => {
                    tracing::warn!("Tracker state is corrupt, starting fresh: {}", e);
                    WebsiteState::default()
                }
            },
            Ok(None) => WebsiteState::default(),
            Err(e) => {
                tracing::warn!("Failed to read tracker state, starting fresh: {}", e);
                WebsiteState::default()
            }
        };

        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(state)),
            store,
            limits,
            state_tx,
        }
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, WebsiteState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, WebsiteState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> WebsiteState {
        self.read_guard().clone()
    }

    /// Execute a function with read access to the state
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&WebsiteState) -> R,
    {
        f(&self.read_guard())
    }

    pub fn health(&self) -> Health {
        self.read(|s| s.health.clone())
    }

    /// Apply `f` and persist the result.
    pub fn mutate<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut WebsiteState) -> R,
    {
        let (result, json) = {
            let mut state = self.write_guard();
            let result = f(&mut state);
            (result, serde_json::to_string_pretty(&*state))
        };

        match json {
            Ok(json) => self.persist(&json),
            Err(e) => tracing::error!("Failed to serialize tracker state: {}", e),
        }
        result
    }

    fn persist(&self, json: &str) {
        if let Err(e) = self.store.persist(json) {
            tracing::error!("Failed to persist tracker state: {}", e);
        }
    }

    /// Record one watcher event.
    ///
    /// Prepends the entry (dropping the oldest beyond the cap), appends its log line,
    /// recomputes health from the recent window and rewrites the state, in that order.
    pub fn record_change(&self, change: ChangeLog, is_asset: bool) -> Health {
        let path = change.path.clone();
        let action = change.action;
        let line = change.log_line();

        let (previous, health) = self.mutate(|state| {
            let previous = state.health.score;

            state.track_file(&change, is_asset);
            state.last_update = change.timestamp;
            state.push_change(change, self.limits.change_cap);

            if let Err(e) = self.store.append_log(&line) {
                tracing::error!("Failed to append change log: {}", e);
            }

            state.health = compute_health(
                &state.changes,
                self.limits.health_window,
                self.limits.issue_cap,
            );
            (previous, state.health.clone())
        });

        tracing::debug!("Recorded {} {} (health {})", action, path, health.score);

        // Ignore send errors - it's OK if no one is listening
        let _ = self.state_tx.send(StateChange::ChangeRecorded {
            path,
            action,
            score: health.score,
        });
        if previous != health.score {
            let _ = self.state_tx.send(StateChange::HealthUpdated {
                score: health.score,
            });
        }

        health
    }

    /// Stamp `lastUpdate` at build start and persist.
    pub fn stamp_build(&self) {
        self.mutate(|state| state.last_update = Utc::now());
        let _ = self.state_tx.send(StateChange::BuildStamped);
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    pub fn limits(&self) -> &TrackerSettings {
        &self.limits
    }
}
