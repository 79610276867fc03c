// Search orchestrator
// Free-text query -> query embedding -> nearest neighbours -> ranked catalog hits

#[cfg(test)]
mod tests;

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::CatalogField;
use crate::embeddings::Embedder;
use crate::index::IndexLoader;
use crate::{Result, WingmanError};

/// A catalog field matched by a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// 1-based position in the result list
    pub rank: usize,
    /// Distance reported by the index, smaller is closer
    pub distance: f32,
    pub metadata: CatalogField,
    /// Text that was embedded for this field
    pub text: String,
    pub similarity_score: f32,
}

/// Map an index distance onto `(0, 1]`, decreasing as the distance grows
#[inline]
pub fn similarity_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance)
}

pub struct SearchOrchestrator {
    embedder: Arc<dyn Embedder>,
    index: Arc<IndexLoader>,
}

impl SearchOrchestrator {
    #[inline]
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<IndexLoader>) -> Self {
        Self { embedder, index }
    }

    #[inline]
    pub fn index_loader(&self) -> &IndexLoader {
        &self.index
    }

    /// Rank catalog fields against `query`, best match first.
    ///
    /// Returns at most `top_k` hits. Hits keep the index's order; ties are not re-sorted.
    #[inline]
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(WingmanError::InvalidQuery(
                "Query cannot be empty".to_string(),
            ));
        }

        let index = self.index.get().await?;

        if self.embedder.model_name() != index.model_name() {
            return Err(WingmanError::ModelMismatch {
                index_model: index.model_name().to_string(),
                configured_model: self.embedder.model_name().to_string(),
            });
        }

        if top_k == 0 {
            debug!("top_k is 0, skipping search");
            return Ok(Vec::new());
        }

        info!("Searching catalog for: '{}'", query);

        let query_vector = self.embedder.encode(query).await?;
        if query_vector.len() != index.dimension() {
            return Err(WingmanError::DimensionMismatch {
                expected: index.dimension(),
                actual: query_vector.len(),
            });
        }

        let neighbors = index.nearest(&query_vector, top_k).await?;

        let hits = neighbors
            .into_iter()
            .take(top_k)
            .enumerate()
            .map(|(i, neighbor)| {
                let (metadata, text) = index.entry(neighbor.position).ok_or_else(|| {
                    WingmanError::IndexUnavailable(format!(
                        "Index returned position {} but metadata holds {} entries",
                        neighbor.position,
                        index.len()
                    ))
                })?;

                Ok(SearchHit {
                    rank: i + 1,
                    distance: neighbor.distance,
                    metadata: metadata.clone(),
                    text: text.to_string(),
                    similarity_score: similarity_score(neighbor.distance),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        debug!("Search produced {} hits", hits.len());
        Ok(hits)
    }
}
