use std::fs;

use docrag_core::config::RetrievalConfig;
use docrag_core::error::Error;
use docrag_core::filter::Filter;
use docrag_embed::HashEmbedder;
use docrag_hybrid::{Deadline, RetrievalEngine};
use tempfile::TempDir;

const DIM: usize = 48;

fn config() -> RetrievalConfig {
    let mut config = RetrievalConfig::default();
    config.embedding.dim = DIM;
    config.chunking.max_tokens = 24;
    config.chunking.overlap_tokens = 4;
    config.gate.min_score_threshold = 0.1;
    config
}

fn engine_with(config: RetrievalConfig) -> RetrievalEngine {
    let dim = config.embedding.dim;
    RetrievalEngine::new(config, Box::new(HashEmbedder::new(dim))).expect("engine")
}

fn ingested_corpus() -> (TempDir, RetrievalEngine) {
    let corpus = TempDir::new().expect("tempdir");
    fs::write(
        corpus.path().join("onboarding.txt"),
        "New hires complete onboarding within two weeks. Badge requests go to facilities. \
         Laptop setup is handled by IT on the first day.",
    )
    .expect("write");
    let engine = engine_with(config());
    engine.build_index(corpus.path()).expect("ingest");
    (corpus, engine)
}

#[test]
fn save_and_load_preserve_scores() {
    let (_corpus, engine) = ingested_corpus();
    let index_dir = TempDir::new().expect("tempdir");
    engine.save_index(index_dir.path()).expect("save");

    let loaded = engine_with(config());
    loaded.load_index(index_dir.path()).expect("load");

    let question = "who handles laptop setup during onboarding";
    let before = engine
        .retrieve(question, &Filter::new(), Deadline::none())
        .expect("retrieve");
    let after = loaded
        .retrieve(question, &Filter::new(), Deadline::none())
        .expect("retrieve");

    assert_eq!(before.sufficient, after.sufficient);
    assert_eq!(before.chunks.len(), after.chunks.len());
    for (a, b) in before.chunks.iter().zip(after.chunks.iter()) {
        assert_eq!(a.chunk_id, b.chunk_id);
        assert!((a.fused_score - b.fused_score).abs() < 1e-6);
    }
}

#[test]
fn load_rejects_different_embedding_dimensionality() {
    let (_corpus, engine) = ingested_corpus();
    let index_dir = TempDir::new().expect("tempdir");
    engine.save_index(index_dir.path()).expect("save");

    let mut other = config();
    other.embedding.dim = DIM * 2;
    let incompatible = engine_with(other);
    let err = incompatible
        .load_index(index_dir.path())
        .expect_err("dim mismatch");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn load_rejects_different_chunking_parameters() {
    let (_corpus, engine) = ingested_corpus();
    let index_dir = TempDir::new().expect("tempdir");
    engine.save_index(index_dir.path()).expect("save");

    let mut other = config();
    other.chunking.max_tokens = 99;
    let incompatible = engine_with(other);
    let err = incompatible
        .load_index(index_dir.path())
        .expect_err("chunking mismatch");
    assert!(matches!(err, Error::InvalidConfig(_)));
}

#[test]
fn save_before_ingestion_fails() {
    let engine = engine_with(config());
    let index_dir = TempDir::new().expect("tempdir");
    assert!(matches!(
        engine.save_index(index_dir.path()),
        Err(Error::IndexNotBuilt)
    ));
}
