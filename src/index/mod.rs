// Vector index adapter
// An opaque k-NN index paired with a side-car holding the catalog entry for every vector position

pub mod builder;
pub mod lance;
pub mod loader;
pub mod metadata;


use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::CatalogField;
use crate::{Result, WingmanError};

pub use builder::{BuildSummary, IndexBuilder};
pub use lance::LanceIndex;
pub use loader::IndexLoader;
pub use metadata::IndexMetadata;

/// One nearest-neighbour result: the distance to the query and the vector's position in the index
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub distance: f32,
    pub position: usize,
}

/// Opaque nearest-neighbour index over fixed-dimension vectors.
///
/// Implementations are read-only once constructed and may be queried concurrently.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Dimension every stored and queried vector must have
    fn dimension(&self) -> usize;

    /// Number of stored vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return up to `k` neighbours of `query`, closest first, in the index's own order
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>>;
}

/// A loaded index bundle: the vector index and its parallel metadata and text arrays
pub struct CatalogIndex {
    index: Arc<dyn VectorIndex>,
    metadata: IndexMetadata,
}

impl std::fmt::Debug for CatalogIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogIndex")
            .field("model_name", &self.metadata.model_name)
            .field("dimension", &self.index.dimension())
            .field("entries", &self.index.len())
            .finish()
    }
}

impl CatalogIndex {
    /// Pair an index with its side-car, checking that both describe the same vectors
    #[inline]
    pub fn new(index: Arc<dyn VectorIndex>, metadata: IndexMetadata) -> Result<Self> {
        metadata.validate()?;

        if index.len() != metadata.len() {
            return Err(WingmanError::IndexUnavailable(format!(
                "Index holds {} vectors but metadata describes {} fields",
                index.len(),
                metadata.len()
            )));
        }

        if index.dimension() != metadata.dimension {
            return Err(WingmanError::IndexUnavailable(format!(
                "Index dimension {} does not match metadata dimension {}",
                index.dimension(),
                metadata.dimension
            )));
        }

        debug!(
            "Catalog index ready: {} entries, {} dimensions, model {}",
            metadata.len(),
            metadata.dimension,
            metadata.model_name
        );

        Ok(Self { index, metadata })
    }

    #[inline]
    pub fn model_name(&self) -> &str {
        &self.metadata.model_name
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Catalog entry and embedded text stored at `position`
    #[inline]
    pub fn entry(&self, position: usize) -> Option<(&CatalogField, &str)> {
        let field = self.metadata.catalog_metadata.get(position)?;
        let text = self.metadata.catalog_texts.get(position)?;
        Some((field, text.as_str()))
    }

    #[inline]
    pub async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.index.search(query, k).await
    }
}
