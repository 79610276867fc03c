// Embeddings module
// Text -> vector encoding used both when building the index and when answering queries

pub mod ollama;

use async_trait::async_trait;

use crate::Result;

pub use ollama::OllamaClient;

/// Opaque text-to-vector model.
///
/// The same model (and version) must be used to build an index and to encode the queries run
/// against it.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the model, recorded in the index side-car
    fn model_name(&self) -> &str;

    async fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Encode several texts, returning one vector per input in input order
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
