use super::*;
use tempfile::TempDir;

fn sample_entry(id: &str, name: &str) -> DocumentEntry {
    DocumentEntry {
        id: id.to_string(),
        name: name.to_string(),
        source_url: format!("https://example.com/{}.pdf", name),
        file_name: format!("{}.pdf", name),
        pages: 12,
        chunks: 48,
        ingested_at: "2024-01-01T00:00:00Z".to_string(),
    }
}

#[test]
fn load_missing_manifest_is_empty() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let manifest =
        Manifest::load(temp_dir.path().join("documents.json")).expect("load should succeed");

    assert!(manifest.is_empty());
}

#[test]
fn save_and_reload_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("documents.json");

    let mut manifest = Manifest::load(&path).expect("load should succeed");
    manifest.upsert(sample_entry("abc123", "attention"));
    manifest.upsert(sample_entry("def456", "bert"));
    manifest.save().expect("save should succeed");

    let reloaded = Manifest::load(&path).expect("reload should succeed");
    assert_eq!(reloaded.documents().len(), 2);
    assert_eq!(
        reloaded.find("abc123").map(|d| d.name.as_str()),
        Some("attention")
    );
}

#[test]
fn upsert_replaces_existing_entry() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut manifest =
        Manifest::load(temp_dir.path().join("documents.json")).expect("load should succeed");

    manifest.upsert(sample_entry("abc123", "attention"));

    let mut updated = sample_entry("abc123", "attention");
    updated.chunks = 99;
    manifest.upsert(updated);

    assert_eq!(manifest.documents().len(), 1);
    assert_eq!(manifest.find("abc123").map(|d| d.chunks), Some(99));
}

#[test]
fn remove_returns_entry() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut manifest =
        Manifest::load(temp_dir.path().join("documents.json")).expect("load should succeed");

    manifest.upsert(sample_entry("abc123", "attention"));

    let removed = manifest.remove("abc123");
    assert_eq!(removed.map(|d| d.name), Some("attention".to_string()));
    assert!(manifest.is_empty());
    assert!(manifest.remove("abc123").is_none());
}

#[test]
fn find_matches_id_then_name() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut manifest =
        Manifest::load(temp_dir.path().join("documents.json")).expect("load should succeed");

    manifest.upsert(sample_entry("abc123", "attention"));
    manifest.upsert(sample_entry("def456", "bert"));

    assert_eq!(
        manifest.find("bert").map(|d| d.id.as_str()),
        Some("def456")
    );
    assert_eq!(
        manifest.find("def456").map(|d| d.name.as_str()),
        Some("bert")
    );
    assert!(manifest.find("unknown").is_none());
}

#[test]
fn document_ids_are_stable_and_short() {
    let a = document_id_for_url("https://example.com/paper.pdf");
    let b = document_id_for_url("https://example.com/paper.pdf");
    let c = document_id_for_url("https://example.com/other.pdf");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 16);
    assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn chunk_ids_depend_on_document_and_content() {
    let a = chunk_id_for_content("doc_1", "some content");
    let b = chunk_id_for_content("doc_1", "some content");
    let c = chunk_id_for_content("doc_2", "some content");
    let d = chunk_id_for_content("doc_1", "other content");

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_ne!(a, d);
    assert_eq!(a.len(), 64);
}
