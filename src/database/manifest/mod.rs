#[cfg(test)]
mod tests;

use crate::PaperchatError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One ingested document as recorded in the registry file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DocumentEntry {
    pub id: String,
    pub name: String,
    pub source_url: String,
    /// File name of the downloaded copy under the documents directory
    pub file_name: String,
    pub pages: usize,
    pub chunks: usize,
    pub ingested_at: String,
}

/// Registry of ingested documents, persisted as JSON next to the vector
/// database
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Manifest {
    documents: Vec<DocumentEntry>,
    #[serde(skip)]
    path: PathBuf,
}

impl Manifest {
    /// Load the registry from disk, returning an empty one if the file
    /// doesn't exist yet
    #[inline]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PaperchatError> {
        let path = path.as_ref();

        if !path.exists() {
            debug!("No manifest at {:?}, starting empty", path);
            return Ok(Self {
                documents: Vec::new(),
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path)?;
        let mut manifest: Self = serde_json::from_str(&content).map_err(|e| {
            PaperchatError::Database(format!("Failed to parse document registry: {}", e))
        })?;
        manifest.path = path.to_path_buf();

        Ok(manifest)
    }

    #[inline]
    pub fn save(&self) -> Result<(), PaperchatError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(|e| {
            PaperchatError::Database(format!("Failed to serialize document registry: {}", e))
        })?;
        fs::write(&self.path, content)?;

        Ok(())
    }

    /// Insert an entry, replacing any existing entry with the same id
    #[inline]
    pub fn upsert(&mut self, entry: DocumentEntry) {
        self.documents.retain(|d| d.id != entry.id);
        self.documents.push(entry);
    }

    /// Remove an entry by id, returning it if it was present
    #[inline]
    pub fn remove(&mut self, document_id: &str) -> Option<DocumentEntry> {
        let index = self.documents.iter().position(|d| d.id == document_id)?;
        Some(self.documents.remove(index))
    }

    /// Look up a document by id or by name (exact match, id first)
    #[inline]
    pub fn find(&self, id_or_name: &str) -> Option<&DocumentEntry> {
        self.documents
            .iter()
            .find(|d| d.id == id_or_name)
            .or_else(|| self.documents.iter().find(|d| d.name == id_or_name))
    }

    #[inline]
    pub fn documents(&self) -> &[DocumentEntry] {
        &self.documents
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Stable document id derived from the source URL
#[inline]
pub fn document_id_for_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let hex = format!("{:x}", digest);
    // 16 hex chars are plenty to avoid collisions across a personal library
    hex[..16].to_string()
}

/// Content-addressed chunk id, so identical chunks hash to the same id
/// across re-ingestions
#[inline]
pub fn chunk_id_for_content(document_id: &str, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(document_id.as_bytes());
    hasher.update(b"\0");
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}
