use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::model::CatalogEntry;

/// Incident catalog, `item_id -> {title, source_link}`. Display only.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        let entries: BTreeMap<String, CatalogEntry> = serde_json::from_slice(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        info!(path = %path.display(), incidents = entries.len(), "loaded incident catalog");

        Ok(Self { entries })
    }

    pub fn title(&self, item_id: &str) -> Option<&str> {
        self.entries
            .get(item_id.trim())
            .map(|entry| entry.title.as_str())
    }

    pub fn source_link(&self, item_id: &str) -> Option<&str> {
        self.entries
            .get(item_id.trim())
            .and_then(|entry| entry.source_link.as_deref())
    }
}
