// Storage module
// LanceDB holds chunk embeddings; a JSON manifest tracks ingested documents

pub mod lancedb;
pub mod manifest;

pub use lancedb::{ChunkMetadata, EmbeddingRecord, SearchResult, VectorStore};
pub use manifest::{DocumentEntry, Manifest, chunk_id_for_content, document_id_for_url};
