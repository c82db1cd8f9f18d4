use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::{sha256_file, PendingWrite};
use crate::pipeline::SourceReport;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    pub sha256: String,
}

/// Record of one `generate` run, written as `manifest.json` next to the outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub sources: Vec<SourceReport>,
    /// Output files keyed by path relative to the output directory.
    pub files: BTreeMap<String, FileHash>,
}

impl RunManifest {
    pub fn new(version: &str) -> Self {
        Self { version: version.to_string(), generated_at: Utc::now(), sources: Vec::new(), files: BTreeMap::new() }
    }

    /// Hash `path` and record it under its name relative to `root`.
    pub fn add_file(&mut self, root: &Path, path: &Path) -> Result<()> {
        let key = path.strip_prefix(root).unwrap_or(path).to_string_lossy().replace('\\', "/");
        self.files.insert(key, FileHash { sha256: sha256_file(path)? });
        Ok(())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let mut pending = PendingWrite::open(path)?;
        serde_json::to_writer_pretty(&mut pending, self)
            .with_context(|| format!("[config::manifest] Failed to write {}", path.display()))?;
        pending.finalize()
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("[config::manifest] Failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("[config::manifest] Failed to parse {}", path.display()))
    }
}
