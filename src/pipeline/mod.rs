//! Question answering pipeline.
//!
//! question → encode → [`EmbeddingIndex::search`](crate::index::EmbeddingIndex::search)
//! → [`dedupe`] → [`ContextAssembler::build`] → [`PromptTemplate::render`] → generate.
//!
//! Every stage runs in order on the calling thread. The corpus is shared
//! read-only; generation goes through a [`SerializedEngine`] so concurrent
//! requests queue for the model instead of sharing its decoding state.


pub mod context;
pub mod dedup;
pub mod prompt;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::corpus::{Corpus, Document};
use crate::embeddings::QueryEncoder;
use crate::generation::{GenerationEngine, GenerationParams, SerializedEngine};
use crate::index::SearchHit;
use crate::ollama::OllamaClient;
use crate::{LegalRagError, Result};

pub use context::{ContextAssembler, DEFAULT_MAX_CONTEXT_CHARS};
pub use dedup::dedupe;
pub use prompt::{LEGAL_PROMPT, PromptTemplate, REFUSAL_SENTENCE};

/// Message reported for blank questions
pub const EMPTY_QUESTION_MESSAGE: &str = "Question cannot be empty";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Nearest neighbours fetched per question
    pub top_k: usize,
    /// Hard cap on the assembled context, in characters
    pub max_context_chars: usize,
}

impl Default for RetrievalConfig {
    #[inline]
    fn default() -> Self {
        Self {
            top_k: 1,
            max_context_chars: DEFAULT_MAX_CONTEXT_CHARS,
        }
    }
}

/// Successful answer as returned over every transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResponse {
    pub answer: String,
    pub status: String,
}

impl AnswerResponse {
    #[inline]
    pub fn success(answer: String) -> Self {
        Self {
            answer,
            status: "success".to_string(),
        }
    }
}

/// Everything retrieval produced for one question, before generation
#[derive(Debug, Clone)]
pub struct Retrieval<'a> {
    pub hits: Vec<SearchHit>,
    pub documents: Vec<&'a Document>,
    pub context: String,
}

pub struct LegalRagPipeline {
    corpus: Arc<Corpus>,
    encoder: Box<dyn QueryEncoder>,
    engine: SerializedEngine<Box<dyn GenerationEngine>>,
    template: PromptTemplate,
    assembler: ContextAssembler,
    top_k: usize,
    params: GenerationParams,
}

impl std::fmt::Debug for LegalRagPipeline {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegalRagPipeline")
            .field("documents", &self.corpus.len())
            .field("dimension", &self.corpus.dimension())
            .field("top_k", &self.top_k)
            .field("max_context_chars", &self.assembler.max_chars())
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl LegalRagPipeline {
    /// Assemble a pipeline with the default retrieval settings, bundled template
    /// and reference decoding parameters
    #[inline]
    pub fn new<Q, G>(corpus: impl Into<Arc<Corpus>>, encoder: Q, engine: G) -> Self
    where
        Q: QueryEncoder + 'static,
        G: GenerationEngine + 'static,
    {
        let retrieval = RetrievalConfig::default();
        Self {
            corpus: corpus.into(),
            encoder: Box::new(encoder),
            engine: SerializedEngine::new(Box::new(engine)),
            template: PromptTemplate::default(),
            assembler: ContextAssembler::new(retrieval.max_context_chars),
            top_k: retrieval.top_k,
            params: GenerationParams::default(),
        }
    }

    /// Load the corpus and connect to Ollama as described by `config`
    #[inline]
    pub fn from_config(config: &Config) -> Result<Self> {
        info!("Initializing legal RAG pipeline");

        let corpus = Corpus::load(&config.embeddings_path(), &config.metadata_path())?;

        let configured = config.ollama.embedding_dimension as usize;
        if corpus.dimension() != configured {
            return Err(LegalRagError::asset_load(
                "embeddings",
                format!(
                    "matrix dimension {} does not match configured embedding_dimension {}",
                    corpus.dimension(),
                    configured
                ),
            ));
        }

        if !config.ollama.uses_corpus_encoder() {
            warn!(
                "Embedding model {} is not {}; retrieval is only meaningful if it produced the matrix",
                config.ollama.embedding_model,
                crate::ollama::CORPUS_EMBEDDING_MODEL
            );
        }

        let template = match config.template_path() {
            Some(path) => PromptTemplate::load(&path)?,
            None => PromptTemplate::default(),
        };

        let client = OllamaClient::new(config)?;
        info!("Ollama client ready at {}", client.base_url());

        let pipeline = Self::new(corpus, client.clone(), client)
            .with_retrieval(&config.retrieval)
            .with_template(template)
            .with_generation_params(config.generation.clone());

        info!("Pipeline ready: {:?}", pipeline);
        Ok(pipeline)
    }

    #[inline]
    pub fn with_retrieval(mut self, retrieval: &RetrievalConfig) -> Self {
        self.top_k = retrieval.top_k;
        self.assembler = ContextAssembler::new(retrieval.max_context_chars);
        self
    }

    #[inline]
    pub fn with_template(mut self, template: PromptTemplate) -> Self {
        self.template = template;
        self
    }

    #[inline]
    pub fn with_generation_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }

    #[inline]
    pub fn corpus(&self) -> &Corpus {
        &self.corpus
    }

    #[inline]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    #[inline]
    pub fn generation_params(&self) -> &GenerationParams {
        &self.params
    }

    /// Retrieval stages only: validate, encode, search, dedupe and assemble
    #[inline]
    pub fn retrieve(&self, question: &str) -> Result<Retrieval<'_>> {
        self.retrieve_with_k(question, self.top_k)
    }

    /// As [`retrieve`](Self::retrieve) with an explicit neighbour count
    #[inline]
    pub fn retrieve_with_k(&self, question: &str, k: usize) -> Result<Retrieval<'_>> {
        let question = validate_question(question)?;
        info!("Incoming question ({} characters)", question.chars().count());
        debug!("Question: {}", question);

        let query = self.encoder.encode(question)?;
        debug!("Query encoded: {} dimensions", query.len());

        info!("Searching {} provisions, top-k {}", self.corpus.len(), k);
        let hits = self.corpus.index().search(&query, k)?;
        for (rank, hit) in hits.iter().enumerate() {
            debug!(
                "Result {}: Index {}, Distance {:.4}",
                rank + 1,
                hit.row_index,
                hit.distance
            );
        }

        let documents = dedupe(&hits, self.corpus.documents());
        info!(
            "{} hit(s), {} unique provision(s)",
            hits.len(),
            documents.len()
        );
        for (rank, document) in documents.iter().enumerate() {
            info!(
                "{}. Chapter {} Section {} | Text length: {} characters",
                rank + 1,
                document.chapter,
                document.section,
                document.text.chars().count()
            );
        }

        let context = self.assembler.build(&documents);
        info!("Context size {} characters", context.chars().count());

        Ok(Retrieval {
            hits,
            documents,
            context,
        })
    }

    /// Render the prompt that [`answer`](Self::answer) would send to the engine
    #[inline]
    pub fn prompt_for(&self, question: &str) -> Result<String> {
        let retrieval = self.retrieve(question)?;
        Ok(self.render_prompt(&retrieval.context, question))
    }

    /// Answer `question` from the corpus. Blank questions fail before any retrieval.
    #[inline]
    pub fn answer(&self, question: &str) -> Result<String> {
        let started = Instant::now();
        let retrieval = self.retrieve(question)?;
        let prompt = self.render_prompt(&retrieval.context, question);

        info!("Generating answer");
        let answer = self.engine.generate(&prompt, &self.params)?.trim().to_string();

        info!(
            "Pipeline finished in {:.2}s, answer {} characters",
            started.elapsed().as_secs_f64(),
            answer.chars().count()
        );
        Ok(answer)
    }

    fn render_prompt(&self, context: &str, question: &str) -> String {
        let prompt = self.template.render(context, question);
        info!("Prompt length {} characters", prompt.chars().count());
        prompt
    }
}

/// Reject empty or whitespace-only questions
#[inline]
pub fn validate_question(question: &str) -> Result<&str> {
    if question.trim().is_empty() {
        return Err(LegalRagError::Validation(EMPTY_QUESTION_MESSAGE.to_string()));
    }
    Ok(question)
}
