// Embeddings module
// Handles Ollama integration and page chunking

pub mod chunking;
pub mod ollama;

pub use chunking::{ChunkingConfig, ContentChunk, chunk_pages, estimate_token_count};
pub use ollama::{EmbeddingResult, OllamaClient};
