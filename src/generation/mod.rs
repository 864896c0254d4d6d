//! Text generation seam.
//!
//! Local inference backends keep a single decoding context, so every engine is
//! driven through [`SerializedEngine`], which admits one `generate` call at a time.


use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::Result;

/// Instruction prepended by engines that support a system prompt
pub const SYSTEM_INSTRUCTION: &str = "You are a legal information assistant for Nepal's National Penal Code, 2017.\n\
Answer ONLY using the legal text provided. Be direct and factual.";

/// Decoding parameters passed through to the engine unchanged on every call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationParams {
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    pub repetition_penalty: f32,
    /// Generation halts at the first of these sequences
    pub stop: Vec<String>,
}

impl Default for GenerationParams {
    #[inline]
    fn default() -> Self {
        Self {
            max_tokens: 96,
            temperature: 0.1,
            top_p: 0.8,
            repetition_penalty: 1.05,
            stop: vec!["\n\n".to_string(), "Question:".to_string(), "---".to_string()],
        }
    }
}

/// A text-generation backend. Implementations need not be reentrant or `Sync`.
pub trait GenerationEngine: Send {
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String>;
}

impl<T: GenerationEngine + ?Sized> GenerationEngine for Box<T> {
    #[inline]
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        (**self).generate(prompt, params)
    }
}

impl<T: GenerationEngine + Sync + ?Sized> GenerationEngine for std::sync::Arc<T> {
    #[inline]
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        (**self).generate(prompt, params)
    }
}

/// Wraps an engine that is not reentrant and serializes calls into it
#[derive(Debug)]
pub struct SerializedEngine<E> {
    inner: Mutex<E>,
}

impl<E> SerializedEngine<E> {
    #[inline]
    pub fn new(engine: E) -> Self {
        Self {
            inner: Mutex::new(engine),
        }
    }

    #[inline]
    pub fn into_inner(self) -> E {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// A panic inside `generate` ends only that request; later callers reuse the engine.
    fn acquire(&self) -> MutexGuard<'_, E> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("Generation engine panicked during a previous request, recovering");
            self.inner.clear_poison();
            poisoned.into_inner()
        })
    }
}

impl<E: GenerationEngine> GenerationEngine for SerializedEngine<E> {
    #[inline]
    fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        debug!("Waiting for generation engine");
        let engine = self.acquire();

        info!(
            "Starting inference: prompt {} chars, max {} tokens",
            prompt.chars().count(),
            params.max_tokens
        );
        let started = Instant::now();
        let output = engine.generate(prompt, params)?;
        info!(
            "Inference completed in {:.2}s, output {} chars",
            started.elapsed().as_secs_f64(),
            output.chars().count()
        );

        Ok(output)
    }
}
