
use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::config::Config;
use crate::database::VectorStore;
use crate::embeddings::ollama::OllamaClient;

/// Number of chunks retrieved per question unless overridden
pub const DEFAULT_TOP_K: usize = 5;
/// Typing this (any letter case) ends the session
pub const EXIT_SENTINEL: &str = "exit";

pub const PROMPT_TEMPLATE: &str = "\
You are a helpful assistant answering questions about a document.
Use only the context below to answer. If the context does not contain
the answer, say you don't know.

Context:
{context}

Question: {question}

Answer:";

/// Source of context chunks for a question
#[async_trait]
pub trait ContextRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

/// Text generation backend
#[async_trait]
pub trait Generator {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Retriever backed by the vector store, embedding queries through Ollama
pub struct VectorRetriever {
    client: OllamaClient,
    store: VectorStore,
    /// Restrict retrieval to one document when set
    document_id: Option<String>,
}

impl VectorRetriever {
    #[inline]
    pub async fn new(config: &Config, document_id: Option<String>) -> Result<Self> {
        let client = OllamaClient::new(config).context("Failed to initialize Ollama client")?;
        let store = VectorStore::new(config)
            .await
            .context("Failed to open vector store")?;

        Ok(Self {
            client,
            store,
            document_id,
        })
    }
}

#[async_trait]
impl ContextRetriever for VectorRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let embedded = self
            .client
            .generate_embedding(query)
            .context("Failed to embed query")?;

        let results = self
            .store
            .search_similar(&embedded.embedding, k, self.document_id.as_deref())
            .await?;

        debug!("Retrieved {} chunks for query", results.len());

        Ok(results
            .into_iter()
            .map(|r| r.chunk_metadata.content)
            .collect())
    }
}

/// Generator backed by the Ollama chat model
pub struct OllamaGenerator {
    client: OllamaClient,
}

impl OllamaGenerator {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let client = OllamaClient::new(config).context("Failed to initialize Ollama client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.client.generate(prompt)
    }
}

/// Join retrieved chunks into one context block, blank line between chunks,
/// preserving retrieval order
#[inline]
pub fn assemble_context(chunks: &[String]) -> String {
    chunks.join("\n\n")
}

#[inline]
pub fn build_prompt(context: &str, question: &str) -> String {
    PROMPT_TEMPLATE
        .replace("{context}", context)
        .replace("{question}", question)
}

/// Interactive question/answer loop over a retriever and a generator
pub struct ChatSession<R, G> {
    retriever: R,
    generator: G,
    top_k: usize,
}

impl<R: ContextRetriever, G: Generator> ChatSession<R, G> {
    #[inline]
    pub fn new(retriever: R, generator: G, top_k: usize) -> Self {
        Self {
            retriever,
            generator,
            top_k,
        }
    }

    /// Run the loop until the exit sentinel or EOF.
    ///
    /// Empty and whitespace-only lines re-prompt without touching the index
    /// or the model. Answers are printed verbatim. A retrieval or generation
    /// failure propagates and ends the session.
    #[inline]
    pub async fn run<I: BufRead, O: Write>(&self, input: &mut I, output: &mut O) -> Result<()> {
        loop {
            write!(output, "> ")?;
            output.flush()?;

            let mut line = String::new();
            let bytes_read = input.read_line(&mut line)?;
            if bytes_read == 0 {
                // EOF behaves like the exit sentinel
                writeln!(output)?;
                return Ok(());
            }

            let question = line.trim();
            if question.is_empty() {
                continue;
            }
            if question.eq_ignore_ascii_case(EXIT_SENTINEL) {
                info!("Chat session ended by operator");
                return Ok(());
            }

            let answer = self.answer(question).await?;
            writeln!(output, "{}", answer)?;
        }
    }

    /// Answer a single question: retrieve, build the prompt, generate
    #[inline]
    pub async fn answer(&self, question: &str) -> Result<String> {
        let chunks = self
            .retriever
            .retrieve(question, self.top_k)
            .await
            .context("Context retrieval failed")?;

        let context = assemble_context(&chunks);
        let prompt = build_prompt(&context, question);
        debug!("Built prompt of {} bytes", prompt.len());

        self.generator
            .generate(&prompt)
            .await
            .context("Generation failed")
    }
}
