// LanceDB vector database module
// Handles vector storage and similarity search for embeddings

pub mod vector_store;

pub use vector_store::{SearchResult, VectorStore};

use serde::{Deserialize, Serialize};

/// Embedding record stored in LanceDB
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: ChunkMetadata,
}

/// Metadata for a chunk stored alongside its embedding
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    /// Content hash of the chunk, stable across re-ingestion
    pub chunk_id: String,
    /// ID of the document this chunk belongs to
    pub document_id: String,
    /// Display name of the document
    pub document_title: String,
    /// URL the document was downloaded from
    pub source_url: String,
    /// 1-based page number the chunk was cut from
    pub page_number: u32,
    /// The actual text content of the chunk
    pub content: String,
    /// Token count of the chunk
    pub token_count: u32,
    /// Index of this chunk within the document (for ordering)
    pub chunk_index: u32,
    /// Timestamp when this embedding was created
    pub created_at: String,
}
