
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
pub const DEFAULT_TOP_K: usize = 25;
pub const DEFAULT_MAX_ENTRIES: usize = 5;
pub const DEFAULT_MAX_CHARS: usize = 1500;

const CONFIG_FILE_NAME: &str = "config.toml";
const DEFAULT_INDEX_FILE_NAME: &str = "catalog_index.lance";
const DEFAULT_METADATA_FILE_NAME: &str = "catalog_metadata.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Ollama connection used to embed both the catalog and incoming queries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    pub model: String,
    pub batch_size: u32,
    pub embedding_dimension: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            model: "nomic-embed-text:latest".to_string(),
            batch_size: 16,
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
        }
    }
}

/// OpenAI-compatible chat completion backend used for explanations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    pub api_base: String,
    pub path: String,
    pub model: String,
    pub timeout_seconds: u64,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.together.xyz".to_string(),
            path: "/v1/chat/completions".to_string(),
            model: "meta-llama/Meta-Llama-3-8B-Instruct-Lite".to_string(),
            timeout_seconds: 60,
            api_key: None,
        }
    }
}

/// Locations of the persisted index bundle. Relative paths resolve against the config directory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub index_path: Option<PathBuf>,
    pub metadata_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_entries: usize,
    pub max_chars: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            max_entries: DEFAULT_MAX_ENTRIES,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error("Invalid port: {0} (must be between 1 and 65535)")]
    InvalidPort(u16),
    #[error("Invalid batch size: {0} (must be between 1 and 1000)")]
    InvalidBatchSize(u32),
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid completion timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidCompletionTimeout(u64),
    #[error("Invalid top_k: {0} (must be between 1 and 1000)")]
    InvalidTopK(usize),
    #[error("Invalid value for environment variable {name}: {value}")]
    InvalidEnvValue { name: String, value: String },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, e.g. `~/.config/wingman`
    #[inline]
    pub fn default_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("wingman"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load the configuration from the default directory with environment overrides applied
    #[inline]
    pub fn load_default() -> Result<Self> {
        let config_dir = Self::default_dir()?;
        let mut config = Self::load(&config_dir)?;
        config
            .apply_env_overrides(|name| std::env::var(name).ok())
            .context("Failed to apply environment overrides")?;
        config
            .validate()
            .context("Configuration validation failed")?;
        Ok(config)
    }

    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(Self {
                base_dir: config_dir.as_ref().to_path_buf(),
                ..Self::default()
            });
        }

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;
        config.base_dir = config_dir.as_ref().to_path_buf();

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// Apply the recognised environment variables on top of the file configuration.
    ///
    /// `lookup` abstracts `std::env::var` so overrides can be exercised without touching the
    /// process environment.
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(model) = non_empty("EMBEDDING_MODEL_NAME") {
            self.embedding.model = model;
        }
        if let Some(model) = non_empty("COMPLETION_MODEL_NAME") {
            self.completion.model = model;
        }
        if let Some(path) = non_empty("INDEX_PATH") {
            self.index.index_path = Some(PathBuf::from(path));
        }
        if let Some(path) = non_empty("METADATA_PATH") {
            self.index.metadata_path = Some(PathBuf::from(path));
        }
        if let Some(key) = non_empty("COMPLETION_API_KEY").or_else(|| non_empty("TOGETHER_API_KEY"))
        {
            self.completion.api_key = Some(key);
        }

        if let Some(value) = non_empty("TOP_K") {
            self.retrieval.top_k = parse_env_number("TOP_K", &value)?;
        }
        if let Some(value) = non_empty("MAX_ENTRIES") {
            self.retrieval.max_entries = parse_env_number("MAX_ENTRIES", &value)?;
        }
        if let Some(value) = non_empty("MAX_CHARS") {
            self.retrieval.max_chars = parse_env_number("MAX_CHARS", &value)?;
        }

        Ok(())
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    /// Get the base directory for the application
    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.embedding.validate()?;
        self.completion.validate()?;
        self.retrieval.validate()?;
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join(CONFIG_FILE_NAME)
    }

    /// Location of the persisted vector index
    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.resolve(self.index.index_path.as_deref(), DEFAULT_INDEX_FILE_NAME)
    }

    /// Location of the metadata side-car stored next to the index
    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(
            self.index.metadata_path.as_deref(),
            DEFAULT_METADATA_FILE_NAME,
        )
    }

    fn resolve(&self, configured: Option<&Path>, default_name: &str) -> PathBuf {
        match configured {
            Some(path) if path.is_absolute() => path.to_path_buf(),
            Some(path) => self.get_base_dir().join(path),
            None => self.get_base_dir().join(default_name),
        }
    }
}

fn parse_env_number(name: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue {
            name: name.to_string(),
            value: value.to_string(),
        })
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if self.batch_size == 0 || self.batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        Ok(())
    }

    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        let url_str = format!("{}://{}:{}", self.protocol, self.host, self.port);
        Url::parse(&url_str).map_err(|_| ConfigError::InvalidUrl(url_str))
    }

    pub fn set_protocol(&mut self, protocol: String) -> Result<(), ConfigError> {
        if protocol != "http" && protocol != "https" {
            return Err(ConfigError::InvalidProtocol(protocol));
        }
        self.protocol = protocol;
        Ok(())
    }

    pub fn set_host(&mut self, host: String) -> Result<(), ConfigError> {
        let candidate = EmbeddingConfig {
            host: host.clone(),
            ..self.clone()
        };
        candidate.validate()?;
        self.host = host;
        Ok(())
    }

    pub fn set_port(&mut self, port: u16) -> Result<(), ConfigError> {
        if port == 0 {
            return Err(ConfigError::InvalidPort(port));
        }
        self.port = port;
        Ok(())
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_batch_size(&mut self, batch_size: u32) -> Result<(), ConfigError> {
        if batch_size == 0 || batch_size > 1000 {
            return Err(ConfigError::InvalidBatchSize(batch_size));
        }
        self.batch_size = batch_size;
        Ok(())
    }
}

impl CompletionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.endpoint()?;

        if self.model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.model.clone()));
        }

        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidCompletionTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Full URL of the chat completions endpoint
    pub fn endpoint(&self) -> Result<Url, ConfigError> {
        let base = Url::parse(&self.api_base)
            .map_err(|_| ConfigError::InvalidUrl(self.api_base.clone()))?;
        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(ConfigError::InvalidProtocol(base.scheme().to_string()));
        }
        base.join(&self.path)
            .map_err(|_| ConfigError::InvalidUrl(format!("{}{}", self.api_base, self.path)))
    }

    pub fn set_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.model = model;
        Ok(())
    }

    pub fn set_api_base(&mut self, api_base: String) -> Result<(), ConfigError> {
        let candidate = CompletionConfig {
            api_base: api_base.clone(),
            ..self.clone()
        };
        candidate.endpoint()?;
        self.api_base = api_base;
        Ok(())
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=1000).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        Ok(())
    }
}
