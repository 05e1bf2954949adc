use crate::config::PerformanceSettings;
use crate::models::{OutputBundle, OutputEntry, PerformanceMetric};
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use std::fs;
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Sizes and counts derived from one emitted bundle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleSummary {
    pub bundle_size: u64,
    pub chunk_count: usize,
    pub asset_count: usize,
    pub warnings: Vec<String>,
}

/// Walk the manifest, sum sizes and flag oversized or import-heavy chunks.
pub fn summarize(bundle: &OutputBundle, limits: &PerformanceSettings) -> BundleSummary {
    let mut summary = BundleSummary::default();

    for (name, entry) in bundle {
        summary.bundle_size += entry.size();
        match entry {
            OutputEntry::Chunk { code, imports, .. } => {
                summary.chunk_count += 1;
                if code.len() as u64 > limits.chunk_size_limit {
                    summary.warnings.push(format!(
                        "Large chunk detected: {} ({:.1} KB)",
                        name,
                        code.len() as f64 / 1024.0
                    ));
                }
                if imports.len() > limits.chunk_import_limit {
                    summary.warnings.push(format!(
                        "Chunk {} has too many imports ({})",
                        name,
                        imports.len()
                    ));
                }
            }
            OutputEntry::Asset { .. } => summary.asset_count += 1,
        }
    }

    summary
}

/// Advice printed under the build summary when a threshold is crossed.
pub fn recommendations(metric: &PerformanceMetric, limits: &PerformanceSettings) -> Vec<String> {
    let mut tips = Vec::new();
    if metric.build_time > limits.slow_build_ms {
        tips.push("Build is slow: consider caching or trimming heavy transforms".to_string());
    }
    if metric.bundle_size > limits.large_bundle_bytes {
        tips.push("Bundle is large: consider code splitting and lazy-loaded routes".to_string());
    }
    if metric.chunk_count > limits.chunk_count_limit {
        tips.push("Many chunks emitted: consider merging small chunks via manualChunks".to_string());
    }
    tips
}

fn import_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"\b(?:import|export)\s*(?:[\w*{}\s,$]*?\bfrom\s*)?["']([^"']+)["']"#)
            .expect("Invalid import regex")
    })
}

/// Static import targets of an emitted chunk, first occurrence order.
pub fn extract_imports(code: &str) -> Vec<String> {
    let mut imports: Vec<String> = Vec::new();
    for caps in import_pattern().captures_iter(code) {
        let target = caps[1].to_string();
        if !imports.contains(&target) {
            imports.push(target);
        }
    }
    imports
}

fn is_chunk_file(path: &Utf8Path) -> bool {
    matches!(path.extension(), Some("js" | "mjs" | "cjs"))
}

/// Build a manifest from an output directory on disk.
///
/// Script files become chunks, everything else (including scripts that are not
/// valid UTF-8) becomes an asset. Keys are `/`-separated paths relative to `dir`.
pub fn bundle_from_dir(dir: &Utf8Path) -> Result<OutputBundle> {
    let mut bundle = OutputBundle::new();

    let mut files: Vec<Utf8PathBuf> = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.with_context(|| format!("Failed to walk output dir: {}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }
        match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => files.push(path),
            Err(path) => tracing::warn!("Skipping non UTF-8 path: {}", path.display()),
        }
    }
    files.sort();

    for path in files {
        let relative = path.strip_prefix(dir).unwrap_or(&path);
        let file_name = relative.components().map(|c| c.as_str()).collect::<Vec<_>>().join("/");

        let bytes = fs::read(&path).with_context(|| format!("Failed to read {}", path))?;
        let entry = if is_chunk_file(&path) {
            match String::from_utf8(bytes) {
                Ok(code) => OutputEntry::Chunk {
                    file_name: file_name.clone(),
                    imports: extract_imports(&code),
                    code,
                },
                Err(err) => OutputEntry::Asset {
                    file_name: file_name.clone(),
                    source: err.into_bytes(),
                },
            }
        } else {
            OutputEntry::Asset {
                file_name: file_name.clone(),
                source: bytes,
            }
        };
        bundle.insert(file_name, entry);
    }

    tracing::debug!("Collected {} output files from {}", bundle.len(), dir);
    Ok(bundle)
}
