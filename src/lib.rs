use thiserror::Error;

pub type Result<T> = std::result::Result<T, LegalRagError>;

#[derive(Error, Debug)]
pub enum LegalRagError {
    #[error("{0}")]
    Validation(String),

    #[error("Query vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Asset load error ({asset}): {message}")]
    AssetLoad { asset: String, message: String },

    #[error("Template error: {0}")]
    Template(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl LegalRagError {
    /// Whether the caller is at fault (bad input) rather than the server.
    #[inline]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    #[inline]
    pub fn asset_load(asset: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::AssetLoad {
            asset: asset.into(),
            message: message.to_string(),
        }
    }
}

pub mod commands;
pub mod config;
pub mod corpus;
pub mod embeddings;
pub mod generation;
pub mod index;
pub mod mcp;
pub mod ollama;
pub mod pipeline;
