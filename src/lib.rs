use thiserror::Error;

pub type Result<T> = std::result::Result<T, PaperchatError>;

#[derive(Error, Debug)]
pub enum PaperchatError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Download failed with HTTP status {status}")]
    Download { status: u16 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Document error: {0}")]
    Document(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

pub mod agent;
pub mod chat;
pub mod commands;
pub mod config;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod ingest;
