use anyhow::{Context, Result};
use std::io;
use tracing::info;

use crate::agent::{Agent, Crew, Task, tools_from_config};
use crate::chat::{ChatSession, DEFAULT_TOP_K, OllamaGenerator, VectorRetriever};
use crate::config::Config;
use crate::database::{Manifest, VectorStore};
use crate::embeddings::ollama::OllamaClient;
use crate::ingest::IngestPipeline;

/// Download and index a document
#[inline]
pub async fn ingest_document(url: &str, name: Option<String>) -> Result<()> {
    let config = Config::load_default()?;
    let mut pipeline = IngestPipeline::new(config).await?;

    let stats = pipeline.ingest_url(url, name.as_deref()).await?;

    println!(
        "Ingested '{}' (ID: {})",
        stats.document_name, stats.document_id
    );
    println!("  Pages: {}", stats.pages);
    println!("  Chunks: {}", stats.chunks);
    println!("  Embeddings: {}", stats.embeddings);
    println!("  Duration: {:.1}s", stats.duration.as_secs_f64());

    Ok(())
}

/// Run the interactive question loop
#[inline]
pub async fn chat(document: Option<String>, top_k: Option<usize>) -> Result<()> {
    let config = Config::load_default()?;

    let manifest = Manifest::load(config.manifest_path())?;
    if manifest.is_empty() {
        println!("No documents have been ingested yet.");
        println!("Use 'paperchat ingest <url>' first.");
        return Ok(());
    }

    // Resolve a document name to its id; None searches across all documents
    let document_id = match document {
        Some(ref id_or_name) => Some(
            manifest
                .find(id_or_name)
                .map(|entry| entry.id.clone())
                .with_context(|| format!("No ingested document matches '{}'", id_or_name))?,
        ),
        None => None,
    };

    let retriever = VectorRetriever::new(&config, document_id).await?;
    let generator = OllamaGenerator::new(&config)?;
    let session = ChatSession::new(retriever, generator, top_k.unwrap_or(DEFAULT_TOP_K));

    println!("Ask a question about your documents. Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    session.run(&mut input, &mut output).await?;

    Ok(())
}

/// Run a single research agent against a task
#[inline]
pub async fn run_agent(description: &str, expected_output: Option<String>) -> Result<()> {
    let config = Config::load_default()?;

    let tools = tools_from_config(&config)?;
    let generator = OllamaGenerator::new(&config)?;

    let agent = Agent {
        role: "a meticulous research assistant".to_string(),
        goal: "answer the task accurately using web search when needed".to_string(),
        backstory: "You verify claims against search results before answering.".to_string(),
    };
    let task = Task {
        description: description.to_string(),
        expected_output: expected_output
            .unwrap_or_else(|| "A concise, factual answer.".to_string()),
    };

    info!("Running agent task: {}", task.description);
    let crew = Crew::new(agent, tools, generator);
    let answer = crew.run(&task).await?;

    println!("{}", answer);
    Ok(())
}

/// List ingested documents
#[inline]
pub async fn list_documents() -> Result<()> {
    let config = Config::load_default()?;
    let manifest = Manifest::load(config.manifest_path())?;

    if manifest.is_empty() {
        println!("No documents have been ingested yet.");
        println!("Use 'paperchat ingest <url>' to add one.");
        return Ok(());
    }

    println!("Ingested Documents ({} total):", manifest.documents().len());
    println!();

    for entry in manifest.documents() {
        println!("📄 {} (ID: {})", entry.name, entry.id);
        println!("   URL: {}", entry.source_url);
        println!("   Pages: {}, Chunks: {}", entry.pages, entry.chunks);
        println!("   Ingested: {}", entry.ingested_at);
        println!();
    }

    Ok(())
}

/// Delete a document and its index entries
#[inline]
pub async fn delete_document(id_or_name: &str) -> Result<()> {
    let config = Config::load_default()?;
    let mut pipeline = IngestPipeline::new(config).await?;

    let removed = pipeline.remove_document(id_or_name).await?;
    println!("Deleted '{}' (ID: {})", removed.name, removed.id);

    Ok(())
}

/// Show index size and Ollama reachability
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default()?;

    let manifest = Manifest::load(config.manifest_path())?;
    println!("Documents: {}", manifest.documents().len());

    let store = VectorStore::new(&config).await?;
    let embeddings = store.count_embeddings().await?;
    println!("Stored embeddings: {}", embeddings);

    let client = OllamaClient::new(&config)?;
    match client.health_check() {
        Ok(()) => println!(
            "Ollama: reachable at {}://{}:{}",
            config.ollama.protocol, config.ollama.host, config.ollama.port
        ),
        Err(e) => println!("Ollama: unreachable ({})", e),
    }

    Ok(())
}
