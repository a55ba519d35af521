
use std::fs;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::{
    ChunkMetadata, DocumentEntry, EmbeddingRecord, Manifest, VectorStore, chunk_id_for_content,
    document_id_for_url,
};
use crate::document::{self, FetchedDocument};
use crate::embeddings::chunking::{ContentChunk, chunk_pages};
use crate::embeddings::ollama::OllamaClient;

/// Pipeline that turns a document URL into searchable embeddings
pub struct IngestPipeline {
    config: Config,
    vector_store: VectorStore,
    ollama_client: OllamaClient,
}

/// Statistics about a completed ingestion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestStats {
    pub document_id: String,
    pub document_name: String,
    pub pages: usize,
    pub chunks: usize,
    pub embeddings: usize,
    pub duration: Duration,
}

impl IngestPipeline {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        let vector_store = VectorStore::new(&config)
            .await
            .context("Failed to initialize vector store")?;

        let ollama_client =
            OllamaClient::new(&config).context("Failed to initialize Ollama client")?;

        Ok(Self {
            config,
            vector_store,
            ollama_client,
        })
    }

    /// Download, parse, chunk, embed and store a document.
    ///
    /// Re-ingesting a URL replaces the document's previous entries instead
    /// of accumulating duplicates. Nothing is written on a failed download.
    #[inline]
    pub async fn ingest_url(&mut self, url: &str, name: Option<&str>) -> Result<IngestStats> {
        let started = Instant::now();

        let url = document::validate_url(url)?;
        let document_id = document_id_for_url(url.as_str());

        self.ollama_client
            .health_check()
            .context("Ollama server is not reachable")?;

        let documents_dir = self.config.documents_dir_path();
        fs::create_dir_all(&documents_dir).context("Failed to create documents directory")?;

        info!("Fetching document from {}", url);
        let agent = document::http_agent();
        let fetched: FetchedDocument = document::fetch_document(&agent, &url, &documents_dir)?;

        let pages = document::extract_pages(&fetched.bytes)?;
        info!("Extracted text from {} pages", pages.len());

        let chunks = chunk_pages(&pages, &self.config.chunking)?;
        if chunks.is_empty() {
            anyhow::bail!("Document produced no text chunks");
        }
        debug!("Split document into {} chunks", chunks.len());

        let document_name = name.map_or_else(
            || {
                let file_name = document::document_file_name(&url);
                file_name
                    .strip_suffix(".pdf")
                    .unwrap_or(&file_name)
                    .to_string()
            },
            str::to_string,
        );

        let records = self.embed_chunks(&chunks, &document_id, &document_name, url.as_str())?;
        let embeddings = records.len();

        // Replace any previous entries for this document
        self.vector_store
            .delete_document_embeddings(&document_id)
            .await
            .context("Failed to clear previous document embeddings")?;
        self.vector_store
            .store_embeddings_batch(records)
            .await
            .context("Failed to store embeddings")?;

        if let Err(e) = self.vector_store.optimize().await {
            warn!("Failed to optimize vector database: {}", e);
        }

        let file_name = fetched
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut manifest = Manifest::load(self.config.manifest_path())?;
        manifest.upsert(DocumentEntry {
            id: document_id.clone(),
            name: document_name.clone(),
            source_url: url.to_string(),
            file_name,
            pages: pages.len(),
            chunks: chunks.len(),
            ingested_at: Utc::now().to_rfc3339(),
        });
        manifest.save()?;

        let stats = IngestStats {
            document_id,
            document_name,
            pages: pages.len(),
            chunks: chunks.len(),
            embeddings,
            duration: started.elapsed(),
        };

        info!(
            "Ingested '{}': {} pages, {} chunks in {:.1}s",
            stats.document_name,
            stats.pages,
            stats.chunks,
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Generate embeddings for all chunks, batch by batch, with a progress
    /// bar when attended
    fn embed_chunks(
        &self,
        chunks: &[ContentChunk],
        document_id: &str,
        document_title: &str,
        source_url: &str,
    ) -> Result<Vec<EmbeddingRecord>> {
        let batch_size = self.config.ollama.batch_size as usize;

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(chunks.len() as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Embedding chunks")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let created_at = Utc::now().to_rfc3339();
        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size) {
            let results = self
                .ollama_client
                .generate_chunk_embeddings(batch)
                .context("Failed to generate embeddings")?;

            for (chunk, result) in batch.iter().zip(results.iter()) {
                records.push(EmbeddingRecord {
                    id: Uuid::new_v4().to_string(),
                    vector: result.embedding.clone(),
                    metadata: ChunkMetadata {
                        chunk_id: chunk_id_for_content(document_id, &chunk.content),
                        document_id: document_id.to_string(),
                        document_title: document_title.to_string(),
                        source_url: source_url.to_string(),
                        page_number: chunk.page_number,
                        content: chunk.content.clone(),
                        token_count: chunk.token_count as u32,
                        chunk_index: chunk.chunk_index as u32,
                        created_at: created_at.clone(),
                    },
                });
            }

            bar.inc(batch.len() as u64);
        }

        bar.finish_and_clear();
        Ok(records)
    }

    /// Remove a document's embeddings, downloaded file and registry entry
    #[inline]
    pub async fn remove_document(&mut self, id_or_name: &str) -> Result<DocumentEntry> {
        let mut manifest = Manifest::load(self.config.manifest_path())?;

        let entry = manifest
            .find(id_or_name)
            .cloned()
            .with_context(|| format!("No ingested document matches '{}'", id_or_name))?;

        self.vector_store
            .delete_document_embeddings(&entry.id)
            .await
            .context("Failed to delete document embeddings")?;

        let file_path = self.config.documents_dir_path().join(&entry.file_name);
        if file_path.exists() {
            fs::remove_file(&file_path).context("Failed to remove downloaded document")?;
        }

        manifest.remove(&entry.id);
        manifest.save()?;

        info!("Removed document '{}'", entry.name);
        Ok(entry)
    }

    /// Total number of stored embeddings
    #[inline]
    pub async fn embedding_count(&self) -> Result<u64> {
        Ok(self.vector_store.count_embeddings().await?)
    }
}
