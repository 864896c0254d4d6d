use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, info_span, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::corpus::Corpus;
use crate::mcp::{McpServer, register_tools};
use crate::ollama::{CORPUS_EMBEDDING_MODEL, OllamaClient};
use crate::pipeline::{AnswerResponse, LegalRagPipeline, context::render_entry};

/// Load configuration and build the pipeline off the async runtime
async fn load_pipeline() -> Result<Arc<LegalRagPipeline>> {
    let config = Config::load().context("Failed to load configuration")?;

    let pipeline = tokio::task::spawn_blocking(move || LegalRagPipeline::from_config(&config))
        .await
        .context("Pipeline initialization task failed")?
        .context("Failed to initialize pipeline")?;

    Ok(Arc::new(pipeline))
}

fn spinner(message: &'static str) -> ProgressBar {
    if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg} [{elapsed}]") {
            bar.set_style(style);
        }
        bar.set_message(message);
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    }
}

/// Answer a single question and print the JSON response
#[inline]
pub async fn ask(question: String) -> Result<()> {
    let pipeline = load_pipeline().await?;

    let request_id = Uuid::new_v4();
    let bar = spinner("Consulting the National Penal Code");

    let outcome = tokio::task::spawn_blocking(move || {
        let span = info_span!("ask", %request_id);
        let _entered = span.enter();
        pipeline.answer(&question)
    })
    .await
    .context("Pipeline task failed")?;

    bar.finish_and_clear();

    let answer = outcome?;
    let response = AnswerResponse::success(answer);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Run retrieval only and print the provisions that would be used as context
#[inline]
pub async fn search(query: String, k: Option<usize>) -> Result<()> {
    let pipeline = load_pipeline().await?;
    let k = k.unwrap_or_else(|| pipeline.top_k());

    let printed = tokio::task::spawn_blocking(move || -> crate::Result<()> {
        let retrieval = pipeline.retrieve_with_k(&query, k)?;
        let documents = pipeline.corpus().documents();

        println!("Nearest provisions ({} hits):", retrieval.hits.len());
        for (rank, hit) in retrieval.hits.iter().enumerate() {
            match documents.get(hit.row_index) {
                Some(document) => println!(
                    "  {}. [Chapter {} Section {}] key {} distance {:.4}",
                    rank + 1,
                    document.chapter,
                    document.section,
                    document.dedup_key(),
                    hit.distance
                ),
                None => println!(
                    "  {}. <row {} without metadata> distance {:.4}",
                    rank + 1,
                    hit.row_index,
                    hit.distance
                ),
            }
        }

        println!();
        println!("Unique provisions ({}):", retrieval.documents.len());
        for document in &retrieval.documents {
            println!("  {}", render_entry(document));
        }

        println!();
        println!(
            "Context ({} characters):",
            retrieval.context.chars().count()
        );
        println!("{}", retrieval.context);
        Ok(())
    })
    .await
    .context("Search task failed")?;

    printed?;
    Ok(())
}

/// Start the MCP server on stdio
#[inline]
pub async fn serve_mcp() -> Result<()> {
    info!("Starting legal RAG MCP server");

    let config = Config::load().context("Failed to load configuration")?;

    // Verify Ollama connectivity before starting
    let client = OllamaClient::new(&config).context("Failed to create Ollama client")?;
    let health = tokio::task::spawn_blocking(move || client.health_check())
        .await
        .context("Health check task failed")?;
    match health {
        Ok(()) => {
            info!(
                "Ollama connected at {}:{} with models {} and {}",
                config.ollama.host,
                config.ollama.port,
                config.ollama.embedding_model,
                config.ollama.generation_model
            );
        }
        Err(e) => {
            warn!("Ollama is reachable but unhealthy: {:#}", e);
            eprintln!("Warning: Ollama may not be ready. Questions may fail until it is.");
        }
    }

    let pipeline = load_pipeline().await?;

    let server = Arc::new(McpServer::new(
        "legal-rag".to_string(),
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    register_tools(&server, &pipeline).await;

    // stdout carries the protocol, so all operator output goes to stderr
    eprintln!(
        "MCP server initialized with tools: {}",
        server.tool_names().await.join(", ")
    );
    eprintln!(
        "Serving {} provisions over stdio. Press Ctrl+C to stop.",
        pipeline.corpus().len()
    );

    tokio::select! {
        result = Arc::clone(&server).serve_stdio() => {
            if let Err(e) = &result {
                error!("MCP server error: {:#}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Received interrupt signal, shutting down...");
        }
    }

    info!("MCP server stopped");
    Ok(())
}

/// Report configuration, asset and Ollama health
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    println!("Legal RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("Configuration:");
    println!("   File: {}", config.config_file_path().display());
    println!(
        "   Retrieval: top_k {}, context cap {} characters",
        config.retrieval.top_k, config.retrieval.max_context_chars
    );
    println!();

    println!("Corpus Assets:");
    let embeddings_path = config.embeddings_path();
    let metadata_path = config.metadata_path();
    for (label, path) in [("Embeddings", &embeddings_path), ("Metadata", &metadata_path)] {
        match std::fs::metadata(path) {
            Ok(meta) => println!("   {}: {} ({} bytes)", label, path.display(), meta.len()),
            Err(_) => println!("   {}: {} (missing)", label, path.display()),
        }
    }

    let loaded = tokio::task::spawn_blocking(move || Corpus::load(&embeddings_path, &metadata_path))
        .await
        .context("Corpus load task failed")?;
    match loaded {
        Ok(corpus) => {
            println!(
                "   Loaded: {} provisions, dimension {}",
                corpus.len(),
                corpus.dimension()
            );
            if corpus.dimension() != config.ollama.embedding_dimension as usize {
                println!(
                    "   Warning: configured embedding_dimension is {}",
                    config.ollama.embedding_dimension
                );
            }
            println!(
                "   Query encoder: {} (must be the model that produced the matrix)",
                config.ollama.embedding_model
            );
            if !config.ollama.uses_corpus_encoder() {
                println!(
                    "   Warning: the bundled matrix was built with {}",
                    CORPUS_EMBEDDING_MODEL
                );
            }
        }
        Err(e) => println!("   Failed to load corpus: {}", e),
    }
    println!();

    println!("Ollama Status:");
    match OllamaClient::new(&config) {
        Ok(client) => {
            let health = tokio::task::spawn_blocking(move || client.health_check())
                .await
                .context("Health check task failed")?;
            match health {
                Ok(()) => {
                    println!(
                        "   Ollama: Connected ({}:{})",
                        config.ollama.host, config.ollama.port
                    );
                    println!("   Embedding model: {}", config.ollama.embedding_model);
                    println!("   Generation model: {}", config.ollama.generation_model);
                }
                Err(e) => println!("   Ollama: Unhealthy - {:#}", e),
            }
        }
        Err(e) => println!("   Ollama: Failed to create client - {:#}", e),
    }

    Ok(())
}
