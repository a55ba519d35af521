// Document retrieval module
// Downloads a PDF over HTTP and extracts per-page text


use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, info, warn};
use ureq::Agent;
use url::Url;

use crate::{PaperchatError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
/// Refuse to buffer documents larger than this
const MAX_DOCUMENT_BYTES: u64 = 64 * 1024 * 1024;

/// A downloaded document, kept both in memory and on disk
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    pub bytes: Vec<u8>,
    pub file_path: PathBuf,
}

/// Text content of a single PDF page
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentPage {
    /// 1-based page number in the source document
    pub number: u32,
    pub text: String,
}

/// Build the HTTP agent used for document downloads
#[inline]
pub fn http_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
        .user_agent(concat!("paperchat/", env!("CARGO_PKG_VERSION")))
        .build()
        .into()
}

/// Validate that a URL is a usable http(s) document source
#[inline]
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url)
        .map_err(|e| PaperchatError::Document(format!("Invalid URL '{}': {}", url, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(PaperchatError::Document(format!(
            "Unsupported URL scheme '{}' (only http and https are supported)",
            parsed.scheme()
        )));
    }

    if parsed.host_str().is_none() {
        return Err(PaperchatError::Document(format!(
            "URL '{}' has no host",
            url
        )));
    }

    Ok(parsed)
}

/// Download a document and persist it under `dest_dir`.
///
/// Success is strictly HTTP 200; any other status aborts with
/// [`PaperchatError::Download`] and nothing is written to disk.
#[inline]
pub fn fetch_document(agent: &Agent, url: &Url, dest_dir: &Path) -> Result<FetchedDocument> {
    debug!("Downloading document from {}", url);

    let mut response = match agent.get(url.as_str()).call() {
        Ok(response) => response,
        Err(ureq::Error::StatusCode(code)) => {
            return Err(PaperchatError::Download { status: code });
        }
        Err(e) => {
            return Err(PaperchatError::Network(format!(
                "Failed to fetch {}: {}",
                url, e
            )));
        }
    };

    // ureq only errors on non-2xx; the contract here is stricter
    let status = response.status().as_u16();
    if status != 200 {
        return Err(PaperchatError::Download { status });
    }

    let bytes = response
        .body_mut()
        .with_config()
        .limit(MAX_DOCUMENT_BYTES)
        .read_to_vec()
        .map_err(|e| PaperchatError::Network(format!("Failed to read response body: {}", e)))?;

    fs::create_dir_all(dest_dir)?;
    let file_path = dest_dir.join(document_file_name(url));
    fs::write(&file_path, &bytes)?;

    info!(
        "Downloaded {} bytes from {} to {}",
        bytes.len(),
        url,
        file_path.display()
    );

    Ok(FetchedDocument { bytes, file_path })
}

/// Derive a local file name from the URL's last path segment
#[inline]
pub fn document_file_name(url: &Url) -> String {
    let name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back().map(str::to_string))
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| "document".to_string());

    if name.to_ascii_lowercase().ends_with(".pdf") {
        name
    } else {
        format!("{}.pdf", name)
    }
}

/// Extract per-page text from an in-memory PDF.
///
/// Pages that yield no extractable text are dropped; a document with no
/// extractable text at all is an error.
#[inline]
pub fn extract_pages(bytes: &[u8]) -> Result<Vec<DocumentPage>> {
    let doc = lopdf::Document::load_mem(bytes)
        .map_err(|e| PaperchatError::Document(format!("Failed to parse PDF: {}", e)))?;

    let page_numbers: Vec<u32> = doc.get_pages().keys().copied().collect();
    let mut pages = Vec::with_capacity(page_numbers.len());

    for number in page_numbers {
        let text = match doc.extract_text(&[number]) {
            Ok(text) => text,
            Err(e) => {
                warn!("Skipping page {}: text extraction failed: {}", number, e);
                continue;
            }
        };

        if text.trim().is_empty() {
            debug!("Skipping page {}: no extractable text", number);
            continue;
        }

        pages.push(DocumentPage { number, text });
    }

    if pages.is_empty() {
        return Err(PaperchatError::Document(
            "Document contains no extractable text".to_string(),
        ));
    }

    debug!("Extracted text from {} pages", pages.len());
    Ok(pages)
}
