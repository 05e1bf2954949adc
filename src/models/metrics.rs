use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Process memory snapshot, in bytes.
///
/// Field names follow the JSON shape consumed by the dev overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryUsage {
    pub heap_used: u64,
    pub heap_total: u64,
    pub external: u64,
}

/// Metrics recorded once per completed build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetric {
    pub timestamp: DateTime<Utc>,
    /// Elapsed build time in milliseconds
    pub build_time: u64,
    /// Sum of chunk code and asset source sizes in bytes
    pub bundle_size: u64,
    pub chunk_count: usize,
    pub asset_count: usize,
    pub memory_usage: MemoryUsage,
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Payload pushed on the periodic memory broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemorySample {
    pub timestamp: DateTime<Utc>,
    pub memory: MemoryUsage,
}
