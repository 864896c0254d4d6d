
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::generation::GenerationParams;
use crate::ollama::{CORPUS_EMBEDDING_MODEL, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_TIMEOUT_SECONDS};
use crate::pipeline::RetrievalConfig;

/// Environment variable overriding the configuration directory
pub const HOME_ENV_VAR: &str = "LEGAL_RAG_HOME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub generation: GenerationParams,
    #[serde(default)]
    pub assets: AssetConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OllamaConfig {
    pub protocol: String,
    pub host: String,
    pub port: u16,
    /// Must be the model that produced the embedding matrix. Matching
    /// dimensions alone do not make two encoders interchangeable.
    pub embedding_model: String,
    pub generation_model: String,
    pub embedding_dimension: u32,
    pub timeout_seconds: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            protocol: "http".to_string(),
            host: "localhost".to_string(),
            port: 11434,
            embedding_model: CORPUS_EMBEDDING_MODEL.to_string(),
            generation_model: "hf.co/yamraj047/nepal-legal-mistral-7b-GGUF:Q4_K_M".to_string(),
            embedding_dimension: DEFAULT_EMBEDDING_DIMENSION,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
        }
    }
}

/// Locations of the corpus assets. Relative paths resolve against the config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    pub embeddings_path: PathBuf,
    pub metadata_path: PathBuf,
    /// Replaces the bundled prompt template when set
    pub template_path: Option<PathBuf>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            embeddings_path: PathBuf::from("final_legal_embeddings.npy"),
            metadata_path: PathBuf::from("final_legal_laws_metadata.json"),
            template_path: None,
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
    #[error("Invalid model name: {0} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid protocol: {0} (must be 'http' or 'https')")]
    InvalidProtocol(String),
    #[error("Invalid embedding dimension: {0} (must be between 64 and 4096)")]
    InvalidEmbeddingDimension(u32),
    #[error("Invalid request timeout: {0} (must be between 1 and 3600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid top_k: {0} (must be between 1 and 50)")]
    InvalidTopK(usize),
    #[error("Invalid max context chars: {0} (must be between 100 and 100000)")]
    InvalidMaxContextChars(usize),
    #[error("Invalid max tokens: {0} (must be between 1 and 4096)")]
    InvalidMaxTokens(u32),
    #[error("Invalid temperature: {0} (must be between 0.0 and 2.0)")]
    InvalidTemperature(f32),
    #[error("Invalid top_p: {0} (must be greater than 0.0 and at most 1.0)")]
    InvalidTopP(f32),
    #[error("Invalid repetition penalty: {0} (must be between 0.5 and 2.0)")]
    InvalidRepetitionPenalty(f32),
    #[error("Invalid asset path for {0} (cannot be empty)")]
    InvalidAssetPath(&'static str),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationParams::default(),
            assets: AssetConfig::default(),
            base_dir: Self::config_dir().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Configuration directory: `$LEGAL_RAG_HOME`, falling back to `~/.legal-rag`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Some(dir) = std::env::var_os(HOME_ENV_VAR).filter(|dir| !dir.is_empty()) {
            return Ok(PathBuf::from(dir));
        }

        dirs::home_dir()
            .map(|home| home.join(".legal-rag"))
            .or({
                #[cfg(windows)]
                {
                    dirs::data_dir().map(|data| data.join("legal-rag"))
                }
                #[cfg(not(windows))]
                {
                    None
                }
            })
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load the configuration from the default configuration directory
    #[inline]
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().context("Failed to determine config directory")?;
        Self::load_from(config_dir)
    }

    #[inline]
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        let config_path = config_dir.as_ref().join("config.toml");

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
        self.ollama.validate()?;
        self.validate_retrieval_config()?;
        self.validate_generation_config()?;
        self.validate_asset_config()?;
        Ok(())
    }

    fn validate_retrieval_config(&self) -> Result<(), ConfigError> {
        let config = &self.retrieval;

        if !(1..=50).contains(&config.top_k) {
            return Err(ConfigError::InvalidTopK(config.top_k));
        }

        if !(100..=100_000).contains(&config.max_context_chars) {
            return Err(ConfigError::InvalidMaxContextChars(
                config.max_context_chars,
            ));
        }

        Ok(())
    }

    fn validate_generation_config(&self) -> Result<(), ConfigError> {
        let params = &self.generation;

        if !(1..=4096).contains(&params.max_tokens) {
            return Err(ConfigError::InvalidMaxTokens(params.max_tokens));
        }

        if !(0.0..=2.0).contains(&params.temperature) {
            return Err(ConfigError::InvalidTemperature(params.temperature));
        }

        if !(params.top_p > 0.0 && params.top_p <= 1.0) {
            return Err(ConfigError::InvalidTopP(params.top_p));
        }

        if !(0.5..=2.0).contains(&params.repetition_penalty) {
            return Err(ConfigError::InvalidRepetitionPenalty(
                params.repetition_penalty,
            ));
        }

        Ok(())
    }

    fn validate_asset_config(&self) -> Result<(), ConfigError> {
        if self.assets.embeddings_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidAssetPath("embeddings_path"));
        }
        if self.assets.metadata_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidAssetPath("metadata_path"));
        }
        if self
            .assets
            .template_path
            .as_ref()
            .is_some_and(|path| path.as_os_str().is_empty())
        {
            return Err(ConfigError::InvalidAssetPath("template_path"));
        }
        Ok(())
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn ollama_url(&self) -> Result<Url, ConfigError> {
        self.ollama.ollama_url()
    }

    /// Resolved path of the embedding matrix (`.npy`)
    #[inline]
    pub fn embeddings_path(&self) -> PathBuf {
        self.resolve(&self.assets.embeddings_path)
    }

    /// Resolved path of the metadata JSON array
    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.resolve(&self.assets.metadata_path)
    }

    #[inline]
    pub fn template_path(&self) -> Option<PathBuf> {
        self.assets
            .template_path
            .as_deref()
            .map(|path| self.resolve(path))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.get_base_dir().join(path)
        }
    }
}

impl OllamaConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.protocol != "http" && self.protocol != "https" {
            return Err(ConfigError::InvalidProtocol(self.protocol.clone()));
        }

        if self.host.trim().is_empty() {
            return Err(ConfigError::InvalidUrl(format!(
                "{}://{}:{}",
                self.protocol, self.host, self.port
            )));
        }

        self.ollama_url()?;

        if self.port == 0 {
            return Err(ConfigError::InvalidPort(self.port));
        }

        if self.embedding_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embedding_model.clone()));
        }

        if self.generation_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.generation_model.clone()));
        }

        if !(64..=4096).contains(&self.embedding_dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(
                self.embedding_dimension,
            ));
        }

        if !(1..=3600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        Ok(())
    }

    /// Whether the configured encoder is the one the bundled matrix was built with.
    /// Ollama tags (`:latest`) and namespaces are ignored.
    #[inline]
    pub fn uses_corpus_encoder(&self) -> bool {
        let name = self
            .embedding_model
            .rsplit('/')
            .next()
            .unwrap_or_default();
        let name = name.split(':').next().unwrap_or_default();
        name.eq_ignore_ascii_case(CORPUS_EMBEDDING_MODEL)
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
        let temp_config = OllamaConfig {
            host: host.clone(),
            ..self.clone()
        };
        temp_config.validate()?;
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

    pub fn set_embedding_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embedding_model = model;
        Ok(())
    }

    pub fn set_generation_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.generation_model = model;
        Ok(())
    }

    pub fn set_embedding_dimension(&mut self, dimension: u32) -> Result<(), ConfigError> {
        if !(64..=4096).contains(&dimension) {
            return Err(ConfigError::InvalidEmbeddingDimension(dimension));
        }
        self.embedding_dimension = dimension;
        Ok(())
    }

    pub fn set_timeout_seconds(&mut self, timeout: u64) -> Result<(), ConfigError> {
        if !(1..=3600).contains(&timeout) {
            return Err(ConfigError::InvalidTimeout(timeout));
        }
        self.timeout_seconds = timeout;
        Ok(())
    }
}
