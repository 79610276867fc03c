use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::catalog::CatalogField;
use crate::{Result, WingmanError};

/// Side-car persisted next to the vector index.
///
/// Position `i` of `catalog_metadata` and `catalog_texts` describes vector `i` of the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub model_name: String,
    pub dimension: usize,
    pub built_at: DateTime<Utc>,
    pub catalog_metadata: Vec<CatalogField>,
    pub catalog_texts: Vec<String>,
}

impl IndexMetadata {
    /// Build a side-car for `fields`, rendering the embedding text of each
    #[inline]
    pub fn new(model_name: impl Into<String>, dimension: usize, fields: Vec<CatalogField>) -> Self {
        let catalog_texts = fields.iter().map(CatalogField::embedding_text).collect();
        Self {
            model_name: model_name.into(),
            dimension,
            built_at: Utc::now(),
            catalog_metadata: fields,
            catalog_texts,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.catalog_metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.catalog_metadata.is_empty()
    }

    #[inline]
    pub fn validate(&self) -> Result<()> {
        if self.catalog_metadata.len() != self.catalog_texts.len() {
            return Err(WingmanError::IndexUnavailable(format!(
                "Metadata holds {} fields but {} texts",
                self.catalog_metadata.len(),
                self.catalog_texts.len()
            )));
        }

        if self.model_name.trim().is_empty() {
            return Err(WingmanError::IndexUnavailable(
                "Metadata does not record an embedding model".to_string(),
            ));
        }

        Ok(())
    }

    /// Read a side-car from disk. Any failure means the bundle is unusable.
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading index metadata from {}", path.display());

        let content = fs::read_to_string(path).map_err(|e| {
            WingmanError::IndexUnavailable(format!(
                "Failed to read metadata {}: {}",
                path.display(),
                e
            ))
        })?;

        let metadata: Self = serde_json::from_str(&content).map_err(|e| {
            WingmanError::IndexUnavailable(format!(
                "Failed to parse metadata {}: {}",
                path.display(),
                e
            ))
        })?;

        metadata.validate()?;
        Ok(metadata)
    }

    /// Write the side-car, replacing any existing file only once the new one is complete
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create metadata directory: {}", parent.display())
            })?;
        }

        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize index metadata")?;

        let temp_path = path.with_extension("tmp");
        fs::write(&temp_path, content)
            .with_context(|| format!("Failed to write metadata: {}", temp_path.display()))?;
        fs::rename(&temp_path, path)
            .with_context(|| format!("Failed to move metadata into place: {}", path.display()))?;

        info!(
            "Saved metadata for {} fields to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }
}
