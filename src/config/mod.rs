// Configuration management module
// TOML-backed settings for the Ollama connection, retrieval, generation and corpus assets

pub mod interactive;
pub mod settings;

#[cfg(test)]
mod tests;

pub use interactive::{run_interactive_config, show_config};
pub use settings::{AssetConfig, Config, ConfigError, HOME_ENV_VAR, OllamaConfig};
