use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One emitted output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutputEntry {
    /// Executable code produced by the bundler
    Chunk {
        #[serde(rename = "fileName")]
        file_name: String,
        code: String,
        #[serde(default)]
        imports: Vec<String>,
    },
    /// Static file copied or emitted as-is
    Asset {
        #[serde(rename = "fileName")]
        file_name: String,
        source: Vec<u8>,
    },
}

impl OutputEntry {
    /// Size of the emitted content in bytes
    pub fn size(&self) -> u64 {
        match self {
            OutputEntry::Chunk { code, .. } => code.len() as u64,
            OutputEntry::Asset { source, .. } => source.len() as u64,
        }
    }
}

/// Full emission manifest, keyed by output file name in emission order.
pub type OutputBundle = IndexMap<String, OutputEntry>;

/// Output options passed alongside the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputOptions {
    pub dir: Option<Utf8PathBuf>,
}
