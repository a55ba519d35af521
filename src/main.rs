use clap::{Parser, Subcommand};
use paperchat::Result;
use paperchat::commands::{
    chat, delete_document, ingest_document, list_documents, run_agent, show_status,
};
use paperchat::config::{run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "paperchat")]
#[command(about = "Chat with PDF documents using a local Ollama server and vector search")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Download a PDF from a URL and index it
    Ingest {
        /// URL of the PDF document
        url: String,
        /// Optional name for the document
        #[arg(long)]
        name: Option<String>,
    },
    /// Ask questions about ingested documents interactively
    Chat {
        /// Restrict retrieval to one document (ID or name)
        #[arg(long)]
        document: Option<String>,
        /// Number of chunks to retrieve per question
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Run a research agent with web-search tools against a task
    Agent {
        /// Natural-language task description
        task: String,
        /// What the answer should look like
        #[arg(long)]
        expected_output: Option<String>,
    },
    /// List all ingested documents
    List,
    /// Delete a document and its index entries
    Delete {
        /// Document ID or name to delete
        document: String,
    },
    /// Show index size and Ollama reachability
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
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
        Commands::Ingest { url, name } => {
            ingest_document(&url, name).await?;
        }
        Commands::Chat { document, top_k } => {
            chat(document, top_k).await?;
        }
        Commands::Agent {
            task,
            expected_output,
        } => {
            run_agent(&task, expected_output).await?;
        }
        Commands::List => {
            list_documents().await?;
        }
        Commands::Delete { document } => {
            delete_document(&document).await?;
        }
        Commands::Status => {
            show_status().await?;
        }
    }

    Ok(())
}
