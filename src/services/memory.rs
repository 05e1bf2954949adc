use crate::models::{MemorySample, MemoryUsage};
use chrono::Utc;

/// Sample the current process memory.
///
/// Resident memory is reported as `heapUsed` and virtual memory as `heapTotal`;
/// there is no separate external pool, so `external` stays 0. Platforms where
/// `memory-stats` cannot read the counters yield zeros.
pub fn sample() -> MemoryUsage {
    match memory_stats::memory_stats() {
        Some(stats) => MemoryUsage {
            heap_used: stats.physical_mem as u64,
            heap_total: stats.virtual_mem as u64,
            external: 0,
        },
        None => {
            tracing::debug!("Memory statistics unavailable on this platform");
            MemoryUsage::default()
        }
    }
}

/// Timestamped sample for the periodic broadcast.
pub fn timestamped_sample() -> MemorySample {
    MemorySample {
        timestamp: Utc::now(),
        memory: sample(),
    }
}

/// Format a byte count as megabytes with two decimals
pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_has_no_external_pool() {
        assert_eq!(sample().external, 0);
        assert_eq!(timestamped_sample().memory.external, 0);
    }

    #[test]
    fn test_format_mb() {
        assert_eq!(format_mb(0), "0.00 MB");
        assert_eq!(format_mb(1024 * 1024 * 3 / 2), "1.50 MB");
    }
}
