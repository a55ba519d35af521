#[cfg(test)]
mod tests;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::DocumentPage;

/// A window of page text ready for embedding
#[derive(Debug, Clone, PartialEq)]
pub struct ContentChunk {
    pub content: String,
    /// 1-based page number this chunk was cut from
    pub page_number: u32,
    /// Index of this chunk within the document
    pub chunk_index: usize,
    /// Estimated token count
    pub token_count: usize,
}

/// Configuration for splitting pages into overlapping windows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Target window size in tokens
    pub window_size: usize,
    /// Hard ceiling in tokens before forced splitting
    pub max_chunk_size: usize,
    /// Windows smaller than this are merged into their predecessor
    pub min_chunk_size: usize,
    /// Token overlap carried from one window into the next
    pub overlap_size: usize,
}

impl Default for ChunkingConfig {
    #[inline]
    fn default() -> Self {
        Self {
            window_size: 650,
            max_chunk_size: 1000,
            min_chunk_size: 100,
            overlap_size: 50,
        }
    }
}

/// Split extracted pages into embedding-ready overlapping windows
#[inline]
pub fn chunk_pages(pages: &[DocumentPage], config: &ChunkingConfig) -> Result<Vec<ContentChunk>> {
    let mut chunks = Vec::new();
    let mut chunk_index = 0;

    for page in pages {
        let page_chunks = chunk_page(page, config, &mut chunk_index)?;
        chunks.extend(page_chunks);
    }

    let processed = post_process_chunks(chunks, config)?;

    debug!(
        "Chunked {} pages into {} chunks (avg {} tokens)",
        pages.len(),
        processed.len(),
        processed.iter().map(|c| c.token_count).sum::<usize>() / processed.len().max(1)
    );

    Ok(processed)
}

/// Chunk a single page of text
fn chunk_page(
    page: &DocumentPage,
    config: &ChunkingConfig,
    chunk_index: &mut usize,
) -> Result<Vec<ContentChunk>> {
    let mut chunks = Vec::new();
    let content = page.text.trim();

    if content.is_empty() {
        return Ok(chunks);
    }

    let token_count = estimate_token_count(content);

    // Short pages become a single chunk
    if token_count <= config.window_size {
        chunks.push(ContentChunk {
            content: content.to_string(),
            page_number: page.number,
            chunk_index: *chunk_index,
            token_count,
        });
        *chunk_index += 1;
        return Ok(chunks);
    }

    for split in split_by_paragraphs(content, config)? {
        if split.trim().is_empty() {
            continue;
        }

        let chunk_token_count = estimate_token_count(&split);
        chunks.push(ContentChunk {
            content: split,
            page_number: page.number,
            chunk_index: *chunk_index,
            token_count: chunk_token_count,
        });
        *chunk_index += 1;
    }

    Ok(chunks)
}

/// Split page text at paragraph boundaries, falling back to sentences and
/// words when a single paragraph exceeds the window
fn split_by_paragraphs(content: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    for paragraph in content.split("\n\n") {
        if paragraph.trim().is_empty() {
            continue;
        }

        let paragraph_tokens = estimate_token_count(paragraph);

        if paragraph_tokens > config.max_chunk_size {
            // Oversized paragraph: break it at sentence boundaries
            for sentence_split in split_by_sentences(paragraph, config)? {
                let sentence_tokens = estimate_token_count(&sentence_split);
                if current_token_count + sentence_tokens > config.window_size
                    && !current_split.trim().is_empty()
                {
                    splits.push(current_split.trim().to_string());
                    current_split.clear();
                    current_token_count = 0;
                }
                current_split.push_str(&sentence_split);
                current_split.push_str("\n\n");
                current_token_count += sentence_tokens;
            }
        } else {
            if current_token_count + paragraph_tokens > config.window_size
                && !current_split.trim().is_empty()
            {
                splits.push(current_split.trim().to_string());
                current_split.clear();
                current_token_count = 0;
            }

            current_split.push_str(paragraph);
            current_split.push_str("\n\n");
            current_token_count += paragraph_tokens;
        }
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    Ok(splits)
}

/// Split text by sentences
fn split_by_sentences(text: &str, config: &ChunkingConfig) -> Result<Vec<String>> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    let sentences = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for (i, sentence) in sentences.iter().enumerate() {
        let sentence_with_punct = if i < sentences.len() - 1 {
            format!("{}. ", sentence)
        } else {
            (*sentence).to_string()
        };

        let sentence_tokens = estimate_token_count(&sentence_with_punct);

        // A single run-on sentence can still exceed the window
        if sentence_tokens > config.window_size {
            if !current_split.trim().is_empty() {
                splits.push(current_split.trim().to_string());
                current_split.clear();
                current_token_count = 0;
            }
            splits.extend(split_by_words(&sentence_with_punct, config));
            continue;
        }

        if current_token_count + sentence_tokens > config.window_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&sentence_with_punct);
        current_token_count += sentence_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    Ok(splits)
}

/// Split text by words as a last resort
fn split_by_words(text: &str, config: &ChunkingConfig) -> Vec<String> {
    let mut splits = Vec::new();
    let mut current_split = String::new();
    let mut current_token_count = 0;

    for word in text.split_whitespace() {
        let word_with_space = format!("{} ", word);
        let word_tokens = estimate_token_count(&word_with_space);

        if current_token_count + word_tokens > config.window_size
            && !current_split.trim().is_empty()
        {
            splits.push(current_split.trim().to_string());
            current_split.clear();
            current_token_count = 0;
        }

        current_split.push_str(&word_with_space);
        current_token_count += word_tokens;
    }

    if !current_split.trim().is_empty() {
        splits.push(current_split.trim().to_string());
    }

    splits
}

/// Merge undersized chunks and add overlap between adjacent windows
fn post_process_chunks(
    chunks: Vec<ContentChunk>,
    config: &ChunkingConfig,
) -> Result<Vec<ContentChunk>> {
    if chunks.is_empty() {
        return Ok(chunks);
    }

    let mut processed: Vec<ContentChunk> = Vec::new();

    for chunk in chunks {
        if chunk.token_count < config.min_chunk_size {
            if let Some(last) = processed.last_mut() {
                if last.page_number == chunk.page_number
                    && last.token_count + chunk.token_count <= config.max_chunk_size
                {
                    last.content.push_str("\n\n");
                    last.content.push_str(&chunk.content);
                    last.token_count += chunk.token_count;
                    continue;
                }
            }
        }

        processed.push(chunk);
    }

    if config.overlap_size > 0 {
        processed = add_overlap(processed, config);
    }

    // Re-index chunks
    for (i, chunk) in processed.iter_mut().enumerate() {
        chunk.chunk_index = i;
    }

    Ok(processed)
}

/// Prefix each chunk with the tail of its predecessor from the same page
fn add_overlap(mut chunks: Vec<ContentChunk>, config: &ChunkingConfig) -> Vec<ContentChunk> {
    let mut i = 1;
    while i < chunks.len() {
        let (left, right) = chunks.split_at_mut(i);
        let prev_chunk = &left[i - 1];
        let curr_chunk = &mut right[0];

        if prev_chunk.page_number == curr_chunk.page_number {
            let overlap_text = extract_overlap_text(&prev_chunk.content, config.overlap_size);
            if !overlap_text.is_empty() {
                curr_chunk.content = format!("{}\n\n{}", overlap_text, curr_chunk.content);
                curr_chunk.token_count += estimate_token_count(&overlap_text);
            }
        }
        i += 1;
    }

    chunks
}

/// Extract overlap text from the end of a chunk
fn extract_overlap_text(content: &str, overlap_tokens: usize) -> String {
    let words: Vec<&str> = content.split_whitespace().collect();
    let word_count = (overlap_tokens as f64 * 0.75) as usize; // Rough word-to-token ratio

    if words.len() <= word_count {
        return String::new();
    }

    words[words.len() - word_count.min(words.len())..].join(" ")
}

/// Estimate token count using a simple heuristic
/// This is a rough approximation - actual tokenization would be more accurate
#[inline]
pub fn estimate_token_count(text: &str) -> usize {
    // Rough heuristic: 1 token ≈ 0.75 words for English text
    // Add extra tokens for punctuation and special characters
    let word_count = text.split_whitespace().count();
    let punct_count = text.chars().filter(|c| c.is_ascii_punctuation()).count();

    (punct_count as f64).mul_add(0.1, word_count as f64 / 0.75) as usize
}
