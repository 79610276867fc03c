// Configuration management module
// TOML settings in the config directory, overridden by environment variables

pub mod interactive;
pub mod settings;


pub use interactive::{run_interactive_config, show_config};
pub use settings::{
    CompletionConfig, Config, ConfigError, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_MAX_CHARS,
    DEFAULT_MAX_ENTRIES, DEFAULT_TOP_K, EmbeddingConfig, IndexConfig, RetrievalConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::default_dir()
}
