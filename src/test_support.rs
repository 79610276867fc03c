// Fakes for the external collaborators, shared by unit tests

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::catalog::CatalogField;
use crate::explain::ExplanationService;
use crate::index::{CatalogIndex, IndexLoader, IndexMetadata, Neighbor, VectorIndex};
use crate::prompt::GroundingPrompt;
use crate::embeddings::Embedder;
use crate::search::{SearchHit, similarity_score};
use crate::{Result, WingmanError};

pub const FAKE_MODEL: &str = "fake-embedder";

pub fn field(database: &str, table: &str, name: &str) -> CatalogField {
    CatalogField {
        database_name: database.to_string(),
        database_description: format!("{} database", database),
        table_name: table.to_string(),
        table_description: format!("{} table", table),
        field_name: name.to_string(),
        business_name: name.replace('_', " "),
        business_description: format!("Describes {}", name),
        data_type: "VARCHAR".to_string(),
        length: Some(64),
        tags: Vec::new(),
        sample_values: Vec::new(),
    }
}

pub fn hit(rank: usize, distance: f32, metadata: CatalogField) -> SearchHit {
    SearchHit {
        rank,
        distance,
        text: metadata.embedding_text(),
        metadata,
        similarity_score: similarity_score(distance),
    }
}

/// Embedder returning fixed vectors per text and a default vector otherwise
pub struct FakeEmbedder {
    model: String,
    default_vector: Vec<f32>,
    vectors: HashMap<String, Vec<f32>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl FakeEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            model: FAKE_MODEL.to_string(),
            default_vector: vec![0.0; dimension],
            vectors: HashMap::new(),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn with_vector(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    /// Sleep before answering each encode call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| self.default_vector.clone()))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }
}

/// Index returning a canned neighbour list regardless of the query
pub struct FakeIndex {
    dimension: usize,
    len: usize,
    neighbors: Vec<Neighbor>,
    last_k: Mutex<Option<usize>>,
    calls: AtomicUsize,
}

impl FakeIndex {
    pub fn new(dimension: usize, len: usize, neighbors: Vec<Neighbor>) -> Self {
        Self {
            dimension,
            len,
            neighbors,
            last_k: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_k(&self) -> Option<usize> {
        *self.last_k.lock().expect("lock should not be poisoned")
    }
}

#[async_trait]
impl VectorIndex for FakeIndex {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn len(&self) -> usize {
        self.len
    }

    async fn search(&self, _query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_k.lock().expect("lock should not be poisoned") = Some(k);
        Ok(self.neighbors.iter().take(k).copied().collect())
    }
}

pub fn neighbors(pairs: &[(f32, usize)]) -> Vec<Neighbor> {
    pairs
        .iter()
        .map(|&(distance, position)| Neighbor { distance, position })
        .collect()
}

/// A preloaded index over `fields`, answering every query with `pairs`
pub fn loader_with(
    fields: Vec<CatalogField>,
    dimension: usize,
    pairs: &[(f32, usize)],
) -> (Arc<IndexLoader>, Arc<FakeIndex>) {
    let fake = Arc::new(FakeIndex::new(dimension, fields.len(), neighbors(pairs)));
    let metadata = IndexMetadata::new(FAKE_MODEL, dimension, fields);
    let shared: Arc<dyn VectorIndex> = Arc::clone(&fake) as Arc<dyn VectorIndex>;
    let index = CatalogIndex::new(shared, metadata)
        .expect("fake index should be consistent");
    (Arc::new(IndexLoader::preloaded(index)), fake)
}

#[derive(Debug, Clone, Copy)]
pub enum FakeReply {
    Text(&'static str),
    /// Answers with the text, but only after the delay
    Slow(&'static str, Duration),
    Unavailable,
    Timeout,
}

/// Explanation backend with a fixed reply that records every prompt it receives
pub struct FakeExplainer {
    reply: FakeReply,
    prompts: Mutex<Vec<String>>,
}

impl FakeExplainer {
    pub fn new(reply: FakeReply) -> Self {
        Self {
            reply,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .clone()
    }
}

#[async_trait]
impl ExplanationService for FakeExplainer {
    async fn explain(&self, prompt: &GroundingPrompt) -> Result<String> {
        self.prompts
            .lock()
            .expect("lock should not be poisoned")
            .push(prompt.text().to_string());

        match self.reply {
            FakeReply::Text(text) => Ok(text.trim().to_string()),
            FakeReply::Slow(text, delay) => {
                tokio::time::sleep(delay).await;
                Ok(text.trim().to_string())
            }
            FakeReply::Unavailable => Err(WingmanError::ServiceUnavailable(
                "connection refused".to_string(),
            )),
            FakeReply::Timeout => Err(WingmanError::ServiceTimeout(
                "no response within 1s".to_string(),
            )),
        }
    }
}
