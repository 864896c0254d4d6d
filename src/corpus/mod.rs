//! Corpus assets: the legal provisions and their precomputed embeddings.
//!
//! Row `i` of the embedding matrix belongs to metadata entry `i`. That pairing is
//! checked once in [`Corpus::new`] and trusted everywhere afterwards.


use ndarray::Array2;
use ndarray_npy::{ReadNpyError, read_npy};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::index::EmbeddingIndex;
use crate::{LegalRagError, Result};

/// One provision of the penal code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(deserialize_with = "string_or_number")]
    pub chapter: String,
    #[serde(deserialize_with = "string_or_number")]
    pub section: String,
    #[serde(
        default,
        deserialize_with = "optional_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub subsection: Option<String>,
    pub text: String,
}

/// Identity of a legal provision: two hits with the same key are the same provision.
///
/// An absent subsection is kept as `None`, which never equals `Some("")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub section: String,
    pub subsection: Option<String>,
}

impl fmt::Display for DedupKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.subsection {
            Some(subsection) => write!(f, "{}-{}", self.section, subsection),
            None => write!(f, "{}-<none>", self.section),
        }
    }
}

impl Document {
    #[inline]
    pub fn new(
        chapter: impl Into<String>,
        section: impl Into<String>,
        subsection: Option<&str>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chapter: chapter.into(),
            section: section.into(),
            subsection: subsection.map(str::to_string),
            text: text.into(),
        }
    }

    #[inline]
    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            section: self.section.clone(),
            subsection: self.subsection.clone(),
        }
    }
}

/// The loaded corpus: an embedding index and its index-aligned documents
#[derive(Debug, Clone)]
pub struct Corpus {
    index: EmbeddingIndex,
    documents: Vec<Document>,
}

impl Corpus {
    /// Pair an index with its documents, failing if the row count differs from the document count
    #[inline]
    pub fn new(index: EmbeddingIndex, documents: Vec<Document>) -> Result<Self> {
        if index.len() != documents.len() {
            return Err(LegalRagError::asset_load(
                "corpus",
                format!(
                    "embedding matrix has {} rows but metadata has {} entries",
                    index.len(),
                    documents.len()
                ),
            ));
        }

        Ok(Self { index, documents })
    }

    /// Load both assets from disk and pair them
    #[inline]
    pub fn load(embeddings_path: &Path, metadata_path: &Path) -> Result<Self> {
        info!("Loading corpus assets");
        info!("Embeddings file: {}", embeddings_path.display());
        info!("Metadata file: {}", metadata_path.display());

        let matrix = load_embedding_matrix(embeddings_path)?;
        let documents = load_documents(metadata_path)?;

        let corpus = Self::new(EmbeddingIndex::new(matrix), documents)?;
        info!(
            "Corpus ready: {} provisions, embedding dimension {}",
            corpus.len(),
            corpus.dimension()
        );
        Ok(corpus)
    }

    #[inline]
    pub fn index(&self) -> &EmbeddingIndex {
        &self.index
    }

    #[inline]
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

/// Read a two-dimensional `.npy` array of `f32` (or `f64`, narrowed to `f32`)
#[inline]
pub fn load_embedding_matrix(path: &Path) -> Result<Array2<f32>> {
    debug!("Reading embedding matrix from {}", path.display());

    let matrix = match read_npy::<_, Array2<f32>>(path) {
        Ok(matrix) => matrix,
        Err(ReadNpyError::WrongDescriptor(descriptor)) => {
            warn!(
                "Embedding matrix is not f32 ({:?}), trying f64 and narrowing",
                descriptor
            );
            read_npy::<_, Array2<f64>>(path)
                .map_err(|e| LegalRagError::asset_load("embeddings", e))?
                .mapv(|value| value as f32)
        }
        Err(e) => {
            return Err(LegalRagError::asset_load(
                "embeddings",
                format!("{}: {}", path.display(), e),
            ));
        }
    };

    info!(
        "Embedding matrix shape: [{}, {}]",
        matrix.nrows(),
        matrix.ncols()
    );
    Ok(matrix)
}

/// Read the metadata JSON array, one object per embedding row
#[inline]
pub fn load_documents(path: &Path) -> Result<Vec<Document>> {
    debug!("Reading corpus metadata from {}", path.display());

    let content = fs::read_to_string(path).map_err(|e| {
        LegalRagError::asset_load("metadata", format!("{}: {}", path.display(), e))
    })?;

    let documents: Vec<Document> = serde_json::from_str(&content).map_err(|e| {
        LegalRagError::asset_load("metadata", format!("{}: {}", path.display(), e))
    })?;

    info!("Metadata entries: {}", documents.len());
    Ok(documents)
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(value) => Ok(value),
        serde_json::Value::Number(value) => Ok(value.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(value) => Ok(Some(value)),
        serde_json::Value::Number(value) => Ok(Some(value.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected a string, number or null, found {}",
            other
        ))),
    }
}
