
use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select};

use super::{Config, ConfigError, OllamaConfig};

#[inline]
pub fn run_interactive_config() -> Result<()> {
    eprintln!("{}", style("🔧 Legal RAG Configuration Setup").bold().cyan());
    eprintln!();

    let mut config = load_existing_config()?;

    eprintln!("{}", style("Ollama Configuration").bold().yellow());
    eprintln!("Configure the Ollama instance used for query embeddings and answer generation.");
    eprintln!();

    configure_ollama(&mut config.ollama)?;

    eprintln!();
    eprintln!("{}", style("Retrieval Configuration").bold().yellow());
    configure_retrieval(&mut config)?;

    eprintln!();
    eprintln!("{}", style("Testing configuration...").yellow());

    if test_ollama_connection(&config.ollama) {
        eprintln!("{}", style("✓ Ollama connection successful!").green());
    } else {
        eprintln!(
            "{}",
            style("⚠ Warning: Could not connect to Ollama").yellow()
        );
        eprintln!("You can continue, but make sure Ollama is running before asking questions.");
    }

    eprintln!();
    if Confirm::new()
        .with_prompt("Save configuration?")
        .default(true)
        .interact()?
    {
        config.save().context("Failed to save configuration")?;
        eprintln!("{}", style("✓ Configuration saved successfully!").green());
        eprintln!(
            "Configuration saved to: {}",
            style(config.config_file_path().display()).cyan()
        );
    } else {
        eprintln!("Configuration not saved.");
    }

    Ok(())
}

#[inline]
pub fn show_config() -> Result<()> {
    let config = Config::load().context("Failed to load configuration")?;

    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Ollama Settings:").bold().yellow());
    eprintln!("  Host: {}", style(&config.ollama.host).cyan());
    eprintln!("  Port: {}", style(config.ollama.port).cyan());
    eprintln!(
        "  Embedding Model: {}",
        style(&config.ollama.embedding_model).cyan()
    );
    eprintln!(
        "  Generation Model: {}",
        style(&config.ollama.generation_model).cyan()
    );
    eprintln!(
        "  Embedding Dimension: {}",
        style(config.ollama.embedding_dimension).cyan()
    );
    eprintln!(
        "  Request Timeout: {}s",
        style(config.ollama.timeout_seconds).cyan()
    );

    eprintln!();
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Retrieval Settings:").bold().yellow());
    eprintln!("  Top K: {}", style(config.retrieval.top_k).cyan());
    eprintln!(
        "  Max Context Chars: {}",
        style(config.retrieval.max_context_chars).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Generation Settings:").bold().yellow());
    eprintln!("  Max Tokens: {}", style(config.generation.max_tokens).cyan());
    eprintln!(
        "  Temperature: {}",
        style(config.generation.temperature).cyan()
    );
    eprintln!("  Top P: {}", style(config.generation.top_p).cyan());
    eprintln!(
        "  Repetition Penalty: {}",
        style(config.generation.repetition_penalty).cyan()
    );
    eprintln!("  Stop: {}", style(format!("{:?}", config.generation.stop)).cyan());

    eprintln!();
    eprintln!("{}", style("Assets:").bold().yellow());
    eprintln!(
        "  Embeddings: {}",
        style(config.embeddings_path().display()).cyan()
    );
    eprintln!(
        "  Metadata: {}",
        style(config.metadata_path().display()).cyan()
    );
    match config.template_path() {
        Some(path) => eprintln!("  Prompt Template: {}", style(path.display()).cyan()),
        None => eprintln!("  Prompt Template: {}", style("bundled").cyan()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

fn load_existing_config() -> Result<Config> {
    Config::load().map_or_else(
        |_| {
            eprintln!(
                "{}",
                style("No existing configuration found. Using defaults.").yellow()
            );
            Ok(Config::default())
        },
        |config| {
            eprintln!("{}", style("Found existing configuration.").green());
            Ok(config)
        },
    )
}

fn configure_ollama(ollama: &mut OllamaConfig) -> Result<()> {
    let protocols = &["http", "https"];
    let default_index = protocols
        .iter()
        .position(|&p| p == ollama.protocol)
        .unwrap_or(0);

    let protocol_index = Select::new()
        .with_prompt("Ollama protocol")
        .default(default_index)
        .items(protocols)
        .interact()?;

    let protocol = protocols[protocol_index].to_string();

    let host: String = Input::new()
        .with_prompt("Ollama host")
        .default(ollama.host.clone())
        .validate_with(|input: &String| -> Result<(), ConfigError> {
            let temp_config = OllamaConfig {
                protocol: protocol.clone(),
                host: input.clone(),
                ..OllamaConfig::default()
            };
            temp_config.validate()
        })
        .interact_text()?;

    let port: u16 = Input::new()
        .with_prompt("Ollama port")
        .default(ollama.port)
        .validate_with(|input: &u16| -> Result<(), &str> {
            if *input == 0 {
                Err("Port must be greater than 0")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_model: String = Input::new()
        .with_prompt("Embedding model (must match the precomputed corpus embeddings)")
        .default(ollama.embedding_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    let embedding_dimension: u32 = Input::new()
        .with_prompt("Embedding dimension")
        .default(ollama.embedding_dimension)
        .validate_with(|input: &u32| -> Result<(), &str> {
            if (64..=4096).contains(input) {
                Ok(())
            } else {
                Err("Dimension must be between 64 and 4096")
            }
        })
        .interact_text()?;

    let generation_model: String = Input::new()
        .with_prompt("Generation model")
        .default(ollama.generation_model.clone())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Model name cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;

    ollama.set_protocol(protocol)?;
    ollama.set_host(host)?;
    ollama.set_port(port)?;
    ollama.set_embedding_model(embedding_model)?;
    ollama.set_embedding_dimension(embedding_dimension)?;
    ollama.set_generation_model(generation_model)?;

    Ok(())
}

fn configure_retrieval(config: &mut Config) -> Result<()> {
    let top_k: usize = Input::new()
        .with_prompt("Passages to retrieve per question")
        .default(config.retrieval.top_k)
        .validate_with(|input: &usize| -> Result<(), &str> {
            if (1..=50).contains(input) {
                Ok(())
            } else {
                Err("Top K must be between 1 and 50")
            }
        })
        .interact_text()?;

    config.retrieval.top_k = top_k;
    Ok(())
}

fn test_ollama_connection(ollama: &OllamaConfig) -> bool {
    let url = format!(
        "{}://{}:{}/api/version",
        ollama.protocol, ollama.host, ollama.port
    );

    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(std::time::Duration::from_secs(5)))
        .build()
        .into();

    match agent.get(&url).call() {
        Ok(_) => true,
        Err(ureq::Error::StatusCode(code)) if (400..500).contains(&code) => true,
        Err(_) => false,
    }
}
