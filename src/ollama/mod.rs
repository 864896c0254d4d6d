#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::LegalRagError;
use crate::config::Config;
use crate::embeddings::QueryEncoder;
use crate::generation::{GenerationEngine, GenerationParams, SYSTEM_INSTRUCTION};

/// Sentence encoder that produced the bundled corpus matrix. Ollama must serve
/// it under this name (import the GGUF conversion with `ollama create`).
pub const CORPUS_EMBEDDING_MODEL: &str = "all-mpnet-base-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
/// CPU inference of a 7B model can take minutes
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 300;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// Blocking client for a local Ollama server, used both to embed questions and
/// to generate answers.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    embedding_model: String,
    generation_model: String,
    embedding_dimension: usize,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    system: &'a str,
    stream: bool,
    options: GenerateOptions<'a>,
}

#[derive(Debug, Serialize)]
struct GenerateOptions<'a> {
    num_predict: u32,
    temperature: f32,
    top_p: f32,
    repeat_penalty: f32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    pub size: Option<u64>,
    pub digest: Option<String>,
    pub details: Option<ModelDetails>,
}

#[derive(Debug, Deserialize)]
pub struct ModelDetails {
    pub format: Option<String>,
    pub family: Option<String>,
    pub families: Option<Vec<String>>,
    pub parameter_size: Option<String>,
    pub quantization_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.ollama.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            embedding_model: config.ollama.embedding_model.clone(),
            generation_model: config.ollama.generation_model.clone(),
            embedding_dimension: config.ollama.embedding_dimension as usize,
            agent,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Retry budget for health checks. Embedding and generation are never retried.
    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }

    #[inline]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Test connection to Ollama server and verify both models are available
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        debug!("Performing health check for Ollama at {}", self.base_url);

        let models = self.list_models().context("Server ping failed")?;

        for model in [&self.embedding_model, &self.generation_model] {
            if !models.iter().any(|m| &m.name == model) {
                let available_models: Vec<&str> =
                    models.iter().map(|m| m.name.as_str()).collect();
                warn!(
                    "Model {} not found. Available models: {:?}",
                    model, available_models
                );
                return Err(anyhow::anyhow!(
                    "Model '{}' is not available. Available models: {:?}",
                    model,
                    available_models
                ));
            }
        }

        info!(
            "Health check passed for Ollama server at {} with models {} and {}",
            self.base_url, self.embedding_model, self.generation_model
        );
        Ok(())
    }

    /// List all available models
    #[inline]
    pub fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self
            .base_url
            .join("/api/tags")
            .context("Failed to build models URL")?;

        debug!("Fetching available models from {}", url);

        let response_text = self
            .make_request_with_retry(|| {
                self.agent
                    .get(url.as_str())
                    .call()
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to fetch models")?;

        let models_response: ModelsResponse =
            serde_json::from_str(&response_text).context("Failed to parse models response")?;

        debug!("Found {} models", models_response.models.len());
        Ok(models_response.models)
    }

    /// Generate the embedding vector for a single text
    #[inline]
    pub fn generate_embedding(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.embedding_model,
            input: text,
        };

        let url = self
            .base_url
            .join("/api/embed")
            .context("Failed to build embedding URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize embedding request")?;

        let response_text = self
            .make_request(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate embedding")?;

        let embed_response: EmbedResponse =
            serde_json::from_str(&response_text).context("Failed to parse embedding response")?;

        let embedding = embed_response
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no vectors"))?;

        if embedding.len() != self.embedding_dimension {
            warn!(
                "Embedding model {} returned {} dimensions, configured {}",
                self.embedding_model,
                embedding.len(),
                self.embedding_dimension
            );
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    /// Run a single non-streaming completion
    #[inline]
    pub fn generate_completion(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        debug!(
            "Generating completion with {} (prompt length: {})",
            self.generation_model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.generation_model,
            prompt: format!("{}\nAnswer:", prompt),
            system: SYSTEM_INSTRUCTION,
            stream: false,
            options: GenerateOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                top_p: params.top_p,
                repeat_penalty: params.repetition_penalty,
                stop: &params.stop,
            },
        };

        let url = self
            .base_url
            .join("/api/generate")
            .context("Failed to build generation URL")?;

        let request_json =
            serde_json::to_string(&request).context("Failed to serialize generation request")?;

        let response_text = self
            .make_request(|| {
                self.agent
                    .post(url.as_str())
                    .header("Content-Type", "application/json")
                    .send(&request_json)
                    .and_then(|mut resp| resp.body_mut().read_to_string())
            })
            .context("Failed to generate completion")?;

        let generate_response: GenerateResponse = serde_json::from_str(&response_text)
            .context("Failed to parse generation response")?;

        debug!(
            "Generated {} characters ({:?} tokens)",
            generate_response.response.len(),
            generate_response.eval_count
        );
        Ok(generate_response.response)
    }

    fn make_request<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        request_fn().map_err(|error| match error {
            ureq::Error::StatusCode(status) => {
                error!("Ollama returned HTTP {} at {}", status, self.base_url);
                anyhow::anyhow!("Ollama returned HTTP {}", status)
            }
            other => {
                error!("Request to {} failed: {}", self.base_url, other);
                anyhow::anyhow!("Request error: {}", other)
            }
        })
    }

    fn make_request_with_retry<F>(&self, mut request_fn: F) -> Result<String>
    where
        F: FnMut() -> Result<String, ureq::Error>,
    {
        let mut last_error = None;

        for attempt in 1..=self.retry_attempts {
            debug!("HTTP request attempt {}/{}", attempt, self.retry_attempts);

            match request_fn() {
                Ok(response_text) => {
                    debug!("Request succeeded on attempt {}", attempt);
                    return Ok(response_text);
                }
                Err(error) => {
                    let should_retry = match &error {
                        ureq::Error::StatusCode(status) => {
                            if *status >= 500 {
                                warn!(
                                    "Server error (status {}), attempt {}/{}",
                                    status, attempt, self.retry_attempts
                                );
                                true
                            } else {
                                warn!("Client error (status {}), not retrying", status);
                                return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                            }
                        }
                        ureq::Error::ConnectionFailed
                        | ureq::Error::HostNotFound
                        | ureq::Error::Timeout(_)
                        | ureq::Error::Io(_) => {
                            warn!(
                                "Transport error: {}, attempt {}/{}",
                                error, attempt, self.retry_attempts
                            );
                            true
                        }
                        _ => {
                            warn!("Non-retryable error: {}", error);
                            false
                        }
                    };

                    if !should_retry {
                        return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                    }

                    last_error = Some(anyhow::anyhow!("Request error: {}", error));

                    if attempt < self.retry_attempts {
                        let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                        let delay = Duration::from_millis(delay_ms);
                        debug!("Waiting {:?} before retry", delay);
                        std::thread::sleep(delay);
                    }
                }
            }
        }

        error!("All retry attempts failed for request to {}", self.base_url);

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
    }
}

impl QueryEncoder for OllamaClient {
    #[inline]
    fn encode(&self, text: &str) -> crate::Result<Vec<f32>> {
        self.generate_embedding(text)
            .map_err(|e| LegalRagError::Encoding(format!("{:#}", e)))
    }
}

impl GenerationEngine for OllamaClient {
    #[inline]
    fn generate(&self, prompt: &str, params: &GenerationParams) -> crate::Result<String> {
        self.generate_completion(prompt, params)
            .map_err(|e| LegalRagError::Generation(format!("{:#}", e)))
    }
}
