//! Services module - Pure analysis logic behind the build extensions.
//!
//! Nothing here knows about hooks, sockets or timers. Each service takes text,
//! manifests or change lists as explicit inputs and returns plain data, which keeps
//! it testable without a running dev server.
//!
//! # Components
//!
//! - [`RuleScanner`]: line-by-line regex rules over source text
//! - [`LinkValidator`]: `href`/`src` extraction and whitelist classification
//! - [`bundle`]: manifest summaries, threshold warnings and output-dir collection
//! - [`file_analysis`]: fingerprints, import extraction, heuristic checks and the
//!   health score formula
//! - [`memory`]: process memory sampling

pub mod bundle;
pub mod file_analysis;
pub mod link_validator;
pub mod memory;
pub mod rule_scanner;

pub use bundle::{BundleSummary, bundle_from_dir, summarize};
pub use file_analysis::{FileDiagnostics, compute_health, fingerprint};
pub use link_validator::{LinkKind, LinkValidator};
pub use rule_scanner::{RuleScanner, ScanError};
