use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What kind of site file a change touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    File,
    Component,
    Route,
    Config,
}

/// Watcher action that produced a change entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Created,
    Modified,
    Deleted,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeType::File => "file",
            ChangeType::Component => "component",
            ChangeType::Route => "route",
            ChangeType::Config => "config",
        };
        f.write_str(s)
    }
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChangeAction::Created => "created",
            ChangeAction::Modified => "modified",
            ChangeAction::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// One recorded file-system change, newest entries first in [`WebsiteState::changes`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeLog {
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub action: ChangeAction,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Change-detection hint, not an integrity proof
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl ChangeLog {
    /// Bare entry with no analysis attached (used for deletions).
    pub fn new(change_type: ChangeType, action: ChangeAction, path: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            change_type,
            action,
            path: path.into(),
            size: None,
            checksum: None,
            dependencies: None,
            errors: None,
            warnings: None,
        }
    }

    pub fn error_count(&self) -> usize {
        self.errors.as_ref().map_or(0, Vec::len)
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.as_ref().map_or(0, Vec::len)
    }

    /// Line written to the plain-text change log: `[timestamp] TYPE ACTION: path`
    pub fn log_line(&self) -> String {
        format!(
            "[{}] {} {}: {}",
            self.timestamp.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            self.change_type.to_string().to_uppercase(),
            self.action.to_string().to_uppercase(),
            self.path
        )
    }
}

/// Heuristic site health derived from recent changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Health {
    pub score: u32,
    pub issues: Vec<String>,
    pub last_check: DateTime<Utc>,
}

impl Default for Health {
    fn default() -> Self {
        Self {
            score: 100,
            issues: Vec::new(),
            last_check: Utc::now(),
        }
    }
}

/// Aggregate tracker state persisted to `website-state.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteState {
    pub last_update: DateTime<Utc>,
    pub total_files: usize,
    /// Paths currently known to exist; `total_files` is its size
    #[serde(default)]
    pub files: BTreeSet<String>,
    #[serde(default)]
    pub components: Vec<String>,
    #[serde(default)]
    pub routes: Vec<String>,
    #[serde(default)]
    pub assets: Vec<String>,
    #[serde(default)]
    pub changes: Vec<ChangeLog>,
    #[serde(default)]
    pub health: Health,
}

impl Default for WebsiteState {
    fn default() -> Self {
        Self {
            last_update: Utc::now(),
            total_files: 0,
            files: BTreeSet::new(),
            components: Vec::new(),
            routes: Vec::new(),
            assets: Vec::new(),
            changes: Vec::new(),
            health: Health::default(),
        }
    }
}

impl WebsiteState {
    /// Prepend a change, dropping the oldest entries beyond `cap`.
    pub fn push_change(&mut self, change: ChangeLog, cap: usize) {
        self.changes.insert(0, change);
        self.changes.truncate(cap);
    }

    /// Keep the file count and the component/route/asset inventories in line with
    /// a change.
    ///
    /// A create or modify for a path already known leaves the count alone, as does a
    /// delete for a path never seen. `is_asset` is decided by the caller from the path
    /// location.
    pub fn track_file(&mut self, change: &ChangeLog, is_asset: bool) {
        match change.action {
            ChangeAction::Created | ChangeAction::Modified => {
                self.files.insert(change.path.clone());
            }
            ChangeAction::Deleted => {
                self.files.remove(&change.path);
            }
        }
        self.total_files = self.files.len();

        let list = match change.change_type {
            ChangeType::Component => Some(&mut self.components),
            ChangeType::Route => Some(&mut self.routes),
            _ if is_asset => Some(&mut self.assets),
            _ => None,
        };

        if let Some(list) = list {
            match change.action {
                ChangeAction::Created | ChangeAction::Modified => {
                    if !list.iter().any(|p| p == &change.path) {
                        list.push(change.path.clone());
                    }
                }
                ChangeAction::Deleted => list.retain(|p| p != &change.path),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_format() {
        let mut entry = ChangeLog::new(ChangeType::Component, ChangeAction::Modified, "src/a.tsx");
        entry.timestamp = DateTime::parse_from_rfc3339("2024-05-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            entry.log_line(),
            "[2024-05-01T10:00:00.000Z] COMPONENT MODIFIED: src/a.tsx"
        );
    }

    #[test]
    fn test_push_change_keeps_newest_first() {
        let mut state = WebsiteState::default();
        for i in 0..5 {
            state.push_change(
                ChangeLog::new(ChangeType::File, ChangeAction::Created, format!("f{i}")),
                3,
            );
        }
        assert_eq!(state.changes.len(), 3);
        assert_eq!(state.changes[0].path, "f4");
        assert_eq!(state.changes[2].path, "f2");
    }

    #[test]
    fn test_track_file_dedups_and_prunes() {
        let mut state = WebsiteState::default();
        let created = ChangeLog::new(ChangeType::Route, ChangeAction::Created, "src/pages/Home.tsx");
        state.track_file(&created, false);
        state.track_file(&created, false);
        assert_eq!(state.routes, vec!["src/pages/Home.tsx".to_string()]);

        let deleted = ChangeLog::new(ChangeType::Route, ChangeAction::Deleted, "src/pages/Home.tsx");
        state.track_file(&deleted, false);
        assert!(state.routes.is_empty());
    }

    #[test]
    fn test_total_files_counts_distinct_paths() {
        let mut state = WebsiteState::default();
        let created = ChangeLog::new(ChangeType::File, ChangeAction::Created, "src/a.ts");
        state.track_file(&created, false);
        state.track_file(&created, false);
        state.track_file(
            &ChangeLog::new(ChangeType::File, ChangeAction::Modified, "src/b.ts"),
            false,
        );
        assert_eq!(state.total_files, 2);

        let gone = ChangeLog::new(ChangeType::File, ChangeAction::Deleted, "src/never.ts");
        state.track_file(&gone, false);
        assert_eq!(state.total_files, 2);

        let deleted = ChangeLog::new(ChangeType::File, ChangeAction::Deleted, "src/a.ts");
        state.track_file(&deleted, false);
        state.track_file(&deleted, false);
        assert_eq!(state.total_files, 1);
        assert!(state.files.contains("src/b.ts"));
    }

    #[test]
    fn test_json_shape_uses_camel_case() {
        let state = WebsiteState::default();
        let json = serde_json::to_value(&state).unwrap();
        assert!(json.get("lastUpdate").is_some());
        assert!(json.get("totalFiles").is_some());
        assert_eq!(json["health"]["score"], 100);
        assert!(json["health"].get("lastCheck").is_some());
    }
}
