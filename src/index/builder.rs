use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{CatalogIndex, IndexMetadata, LanceIndex, VectorIndex};
use crate::catalog::Catalog;
use crate::embeddings::Embedder;
use crate::{Result, WingmanError};

/// Number of texts handed to the embedder per call
const EMBED_CHUNK_SIZE: usize = 64;

/// Suffix of the sibling paths a bundle is written to before it replaces the live one
const STAGING_SUFFIX: &str = ".staging";

/// Outcome of building an index bundle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    pub fields: usize,
    pub dimension: usize,
    pub model_name: String,
}

/// Builds the persisted bundle (vector index + metadata side-car) from a raw catalog
pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    index_path: PathBuf,
    metadata_path: PathBuf,
    expected_dimension: Option<usize>,
    progress: Option<ProgressBar>,
}

impl<'a> IndexBuilder<'a> {
    #[inline]
    pub fn new(
        embedder: &'a dyn Embedder,
        index_path: impl Into<PathBuf>,
        metadata_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            embedder,
            index_path: index_path.into(),
            metadata_path: metadata_path.into(),
            expected_dimension: None,
            progress: None,
        }
    }

    /// Dimension the embedding model is configured to produce; a different one is logged
    #[inline]
    pub fn with_expected_dimension(mut self, dimension: usize) -> Self {
        self.expected_dimension = Some(dimension);
        self
    }

    #[inline]
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Embed every catalog field and write the bundle, returning the loaded result.
    ///
    /// The new bundle is staged beside the live one and swapped in only after both halves are
    /// written, so a failed rebuild leaves the previous bundle loadable.
    #[inline]
    pub async fn build(&self, catalog: &Catalog) -> Result<(CatalogIndex, BuildSummary)> {
        let fields = catalog.fields();
        if fields.is_empty() {
            return Err(WingmanError::Catalog(
                "Catalog contains no fields to index".to_string(),
            ));
        }

        let model_name = self.embedder.model_name().to_string();
        info!(
            "Building index for {} fields with model {}",
            fields.len(),
            model_name
        );

        let mut metadata = IndexMetadata::new(model_name.clone(), 0, fields);
        let vectors = self.embed_all(&metadata.catalog_texts).await?;

        let staged_index = staging_path(&self.index_path);
        let staged_metadata = staging_path(&self.metadata_path);
        if let Err(e) = self
            .write_staged(&vectors, &mut metadata, &staged_index, &staged_metadata)
            .await
        {
            warn!("Index build failed, keeping the previous bundle: {}", e);
            discard_staged(&staged_index, &staged_metadata);
            return Err(e);
        }

        if let Err(e) = self.swap_in(&staged_index, &staged_metadata) {
            discard_staged(&staged_index, &staged_metadata);
            return Err(e);
        }

        if let Some(progress) = &self.progress {
            progress.finish_and_clear();
        }

        let index = LanceIndex::open(&self.index_path).await?;
        let summary = BuildSummary {
            fields: metadata.len(),
            dimension: metadata.dimension,
            model_name,
        };
        let catalog_index = CatalogIndex::new(Arc::new(index), metadata)?;

        info!(
            "Index build complete: {} fields, {} dimensions",
            summary.fields, summary.dimension
        );
        Ok((catalog_index, summary))
    }

    async fn embed_all(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let Some(progress) = &self.progress {
            progress.set_length(texts.len() as u64);
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(EMBED_CHUNK_SIZE) {
            let embedded = self.embedder.encode_batch(chunk).await?;
            if embedded.len() != chunk.len() {
                return Err(WingmanError::Embedding(format!(
                    "Embedder returned {} vectors for {} texts",
                    embedded.len(),
                    chunk.len()
                )));
            }
            vectors.extend(embedded);

            debug!("Embedded {}/{} fields", vectors.len(), texts.len());
            if let Some(progress) = &self.progress {
                progress.inc(chunk.len() as u64);
            }
        }
        Ok(vectors)
    }

    async fn write_staged(
        &self,
        vectors: &[Vec<f32>],
        metadata: &mut IndexMetadata,
        index_path: &Path,
        metadata_path: &Path,
    ) -> Result<()> {
        let index = LanceIndex::create(index_path, vectors).await?;
        let dimension = index.dimension();

        if let Some(expected) = self.expected_dimension {
            if expected != dimension {
                warn!(
                    "Model {} produced {}-dimensional vectors, configuration expects {}",
                    metadata.model_name, dimension, expected
                );
            }
        }

        metadata.dimension = dimension;
        metadata.save(metadata_path)
    }

    fn swap_in(&self, staged_index: &Path, staged_metadata: &Path) -> Result<()> {
        if self.index_path.exists() {
            info!("Replacing existing index at {}", self.index_path.display());
            fs::remove_dir_all(&self.index_path)?;
        }
        fs::rename(staged_index, &self.index_path)?;
        fs::rename(staged_metadata, &self.metadata_path)?;
        Ok(())
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(STAGING_SUFFIX);
    path.with_file_name(name)
}

fn discard_staged(index_path: &Path, metadata_path: &Path) {
    if index_path.exists() {
        if let Err(e) = fs::remove_dir_all(index_path) {
            warn!("Failed to remove staged index {}: {}", index_path.display(), e);
        }
    }
    if metadata_path.exists() {
        if let Err(e) = fs::remove_file(metadata_path) {
            warn!("Failed to remove staged metadata {}: {}", metadata_path.display(), e);
        }
    }
}
