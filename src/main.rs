use clap::{Parser, Subcommand};
use legal_rag::Result;
use legal_rag::commands::{ask, search, serve_mcp, show_status};
use legal_rag::config::{run_interactive_config, show_config};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;

#[derive(Parser)]
#[command(name = "legal-rag")]
#[command(about = "Question answering over Nepal's National Penal Code, 2017")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection, models and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Answer a legal question
    Ask {
        /// The question, in natural language
        question: String,
    },
    /// Show the provisions retrieved for a query without generating an answer
    Search {
        /// Query text
        query: String,
        /// Number of nearest neighbours to fetch
        #[arg(long, short)]
        k: Option<usize>,
    },
    /// Start MCP server on stdio
    Serve,
    /// Show configuration, corpus and Ollama status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::WARN.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config()?;
            } else {
                run_interactive_config()?;
            }
        }
        Commands::Ask { question } => {
            ask(question).await?;
        }
        Commands::Search { query, k } => {
            search(query, k).await?;
        }
        Commands::Serve => {
            serve_mcp().await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
