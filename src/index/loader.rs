use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use super::{CatalogIndex, IndexMetadata, LanceIndex};
use crate::config::Config;
use crate::{Result, WingmanError};

/// Lazily loads the persisted index bundle exactly once.
///
/// Concurrent callers wait on the same load. A failed load is not cached, so a later call can
/// succeed once the bundle appears. After the first success no locking takes place.
#[derive(Debug)]
pub struct IndexLoader {
    index_path: PathBuf,
    metadata_path: PathBuf,
    expected_model: Option<String>,
    cell: OnceCell<Arc<CatalogIndex>>,
}

impl IndexLoader {
    #[inline]
    pub fn new(index_path: impl Into<PathBuf>, metadata_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
            expected_model: None,
            cell: OnceCell::new(),
        }
    }

    /// Loader for the bundle configured in `config`, pinned to the configured embedding model
    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.index_path(), config.metadata_path())
            .with_expected_model(config.embedding.model.clone())
    }

    /// Wrap an index that is already in memory
    #[inline]
    pub fn preloaded(index: CatalogIndex) -> Self {
        Self {
            index_path: PathBuf::new(),
            metadata_path: PathBuf::new(),
            expected_model: None,
            cell: OnceCell::new_with(Some(Arc::new(index))),
        }
    }

    /// Refuse bundles built with a different embedding model
    #[inline]
    pub fn with_expected_model(mut self, model: impl Into<String>) -> Self {
        self.expected_model = Some(model.into());
        self
    }

    #[inline]
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    #[inline]
    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    /// Whether both halves of the bundle exist on disk
    #[inline]
    pub fn bundle_exists(&self) -> bool {
        self.index_path.exists() && self.metadata_path.exists()
    }

    #[inline]
    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }

    /// Get the loaded index, loading it on first use
    #[inline]
    pub async fn get(&self) -> Result<Arc<CatalogIndex>> {
        self.cell
            .get_or_try_init(|| async { self.load().await.map(Arc::new) })
            .await
            .cloned()
    }

    async fn load(&self) -> Result<CatalogIndex> {
        if !self.metadata_path.exists() {
            return Err(WingmanError::IndexUnavailable(format!(
                "Metadata not found at {}",
                self.metadata_path.display()
            )));
        }
        if !self.index_path.exists() {
            return Err(WingmanError::IndexUnavailable(format!(
                "Index not found at {}",
                self.index_path.display()
            )));
        }

        let metadata = IndexMetadata::load(&self.metadata_path)?;

        if let Some(expected) = &self.expected_model {
            if *expected != metadata.model_name {
                warn!(
                    "Index was built with {} but {} is configured",
                    metadata.model_name, expected
                );
                return Err(WingmanError::ModelMismatch {
                    index_model: metadata.model_name,
                    configured_model: expected.clone(),
                });
            }
        }

        let index = LanceIndex::open(&self.index_path).await?;
        let catalog_index = CatalogIndex::new(Arc::new(index), metadata)?;

        info!(
            "Loaded catalog index with {} entries from {}",
            catalog_index.len(),
            self.index_path.display()
        );
        Ok(catalog_index)
    }
}
