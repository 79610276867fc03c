use thiserror::Error;

pub type Result<T> = std::result::Result<T, WingmanError>;

#[derive(Error, Debug)]
pub enum WingmanError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Search unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Embedding dimension mismatch: index expects {expected}, query vector has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error(
        "Embedding model mismatch: index was built with '{index_model}' but '{configured_model}' is configured"
    )]
    ModelMismatch {
        index_model: String,
        configured_model: String,
    },

    #[error("Explanation service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Explanation service timed out: {0}")]
    ServiceTimeout(String),

    #[error("Deadline exceeded: {0}")]
    DeadlineExceeded(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl WingmanError {
    /// Errors raised by the explanation backend. Retrieval results stay valid when one of
    /// these occurs.
    #[inline]
    pub const fn is_explanation_failure(&self) -> bool {
        matches!(self, Self::ServiceUnavailable(_) | Self::ServiceTimeout(_))
    }

    /// Errors that abort the current request before any hits are produced.
    #[inline]
    pub const fn is_retrieval_fatal(&self) -> bool {
        matches!(
            self,
            Self::IndexUnavailable(_)
                | Self::DimensionMismatch { .. }
                | Self::ModelMismatch { .. }
                | Self::DeadlineExceeded(_)
                | Self::Embedding(_)
        )
    }
}

pub mod assistant;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod explain;
pub mod grouping;
pub mod index;
pub mod prompt;
pub mod search;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;
