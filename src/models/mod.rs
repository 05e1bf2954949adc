//! Data models shared by the scanners, the recorder and the tracker.
//!
//! - [`Rule`], [`Issue`], [`LinkIssue`]: ephemeral findings, printed or broadcast and then dropped
//! - [`OutputBundle`]: the emitted-file manifest handed to the bundle hook
//! - [`PerformanceMetric`]: one entry per build, kept in a capped history file
//! - [`ChangeLog`], [`WebsiteState`], [`Health`]: the tracker's persisted state
//!
//! All persisted structs derive `Serialize`/`Deserialize` and use the camelCase JSON
//! field names expected by the dev overlay.

pub mod bundle;
pub mod diagnostics;
pub mod metrics;
pub mod site_state;

pub use bundle::{OutputBundle, OutputEntry, OutputOptions};
pub use diagnostics::{Issue, LinkIssue, Rule, Severity};
pub use metrics::{MemorySample, MemoryUsage, PerformanceMetric};
pub use site_state::{ChangeAction, ChangeLog, ChangeType, Health, WebsiteState};
