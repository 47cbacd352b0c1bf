//! `layouts.index.json`: what the last run generated, and the hash of each file.
//!
//! Build systems diff this file to notice layout changes; the driver reads the
//! previous one to remove artifacts of kinds that left the catalog.

use layoutgen_contracts::{INDEX_FILE_NAME, INDEX_SCHEMA_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::LayoutError;
use crate::target::TargetRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationIndex {
    pub schema_version: String,
    pub target: TargetRecord,
    pub kinds: Vec<IndexKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexKind {
    pub name: String,
    pub lowtag: u32,
    pub size_words: u32,
    pub artifacts: Vec<IndexArtifact>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexArtifact {
    pub file: String,
    pub sha256: String,
}

impl GenerationIndex {
    pub fn new(target: TargetRecord, kinds: Vec<IndexKind>) -> Self {
        GenerationIndex {
            schema_version: INDEX_SCHEMA_VERSION.to_string(),
            target,
            kinds,
        }
    }

    pub fn to_json(&self) -> Result<String, LayoutError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| LayoutError::io("serialize", INDEX_FILE_NAME, e.into()))?;
        Ok(text + "\n")
    }

    /// Parses a previously written index; `None` if it is unreadable or of
    /// another schema version.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let index: GenerationIndex = serde_json::from_slice(bytes).ok()?;
        (index.schema_version == INDEX_SCHEMA_VERSION).then_some(index)
    }

    pub fn files(&self) -> impl Iterator<Item = &str> {
        self.kinds
            .iter()
            .flat_map(|k| k.artifacts.iter().map(|a| a.file.as_str()))
    }
}
