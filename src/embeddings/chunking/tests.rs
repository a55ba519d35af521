use super::estimate_token_count as estimate_token_count_impl;
use super::*;

fn create_test_pages() -> Vec<DocumentPage> {
    vec![
        DocumentPage {
            number: 1,
            text: "This is the abstract of the paper with some basic information about the topic."
                .to_string(),
        },
        DocumentPage {
            number: 2,
            text: "The methodology section explains the approach in detail. ".repeat(100),
        },
    ]
}

#[test]
fn estimate_token_count() {
    assert_eq!(estimate_token_count_impl("hello world"), 2);
    assert_eq!(estimate_token_count_impl("This is a test."), 5);
    assert_eq!(estimate_token_count_impl(""), 0);
}

#[test]
fn short_page_becomes_single_chunk() {
    let pages = create_test_pages();
    let config = ChunkingConfig::default();

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");

    assert!(!chunks.is_empty());
    assert_eq!(chunks.iter().filter(|c| c.page_number == 1).count(), 1);
}

#[test]
fn long_page_splits_into_windows() {
    let pages = create_test_pages();
    let config = ChunkingConfig {
        window_size: 120,
        max_chunk_size: 240,
        min_chunk_size: 50,
        overlap_size: 0,
    };

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");

    let page2_chunks: Vec<_> = chunks.iter().filter(|c| c.page_number == 2).collect();
    assert!(
        page2_chunks.len() > 1,
        "long page should split into multiple windows"
    );
    for chunk in &page2_chunks {
        assert!(
            chunk.token_count <= config.max_chunk_size,
            "chunk of {} tokens exceeds max {}",
            chunk.token_count,
            config.max_chunk_size
        );
    }
}

#[test]
fn adjacent_windows_overlap() {
    let pages = vec![DocumentPage {
        number: 1,
        text: "Sentence about retrieval augmentation and local models. ".repeat(80),
    }];
    let config = ChunkingConfig {
        window_size: 120,
        max_chunk_size: 240,
        min_chunk_size: 50,
        overlap_size: 20,
    };

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");
    assert!(chunks.len() > 1);

    // Each later chunk starts with the tail of its predecessor's original text
    for window in chunks.windows(2) {
        let tail_word = window[0]
            .content
            .split_whitespace()
            .next_back()
            .expect("chunk has words");
        let head: Vec<&str> = window[1].content.split_whitespace().take(30).collect();
        assert!(
            head.contains(&tail_word),
            "expected overlap word {:?} near start of next chunk",
            tail_word
        );
    }
}

#[test]
fn small_chunks_are_merged() {
    let pages = vec![DocumentPage {
        number: 1,
        text: format!(
            "{}\n\n{}",
            "A long opening paragraph that easily clears the minimum size threshold. ".repeat(10),
            "Tiny trailer."
        ),
    }];
    let config = ChunkingConfig {
        window_size: 110,
        max_chunk_size: 300,
        min_chunk_size: 50,
        overlap_size: 0,
    };

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");

    assert!(
        chunks
            .iter()
            .all(|c| c.token_count >= config.min_chunk_size || chunks.len() == 1),
        "no chunk should remain below the minimum size"
    );
    assert!(
        chunks
            .iter()
            .any(|c| c.content.contains("Tiny trailer.")),
        "merged trailer text must survive"
    );
}

#[test]
fn chunk_indices_are_sequential() {
    let pages = create_test_pages();
    let config = ChunkingConfig {
        window_size: 120,
        max_chunk_size: 240,
        min_chunk_size: 50,
        overlap_size: 10,
    };

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");
    for (i, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk.chunk_index, i);
    }
}

#[test]
fn empty_pages_produce_no_chunks() {
    let pages = vec![DocumentPage {
        number: 1,
        text: "   \n\n  ".to_string(),
    }];
    let config = ChunkingConfig::default();

    let chunks = chunk_pages(&pages, &config).expect("chunk_pages should succeed");
    assert!(chunks.is_empty());
}
