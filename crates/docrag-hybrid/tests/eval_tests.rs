use std::fs;

use docrag_core::config::RetrievalConfig;
use docrag_core::error::Error;
use docrag_embed::HashEmbedder;
use docrag_hybrid::{eval, RetrievalEngine};
use tempfile::TempDir;

const DIM: usize = 64;

fn corpus() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    fs::create_dir_all(dir.path().join("FR")).expect("mkdir");
    fs::create_dir_all(dir.path().join("DE")).expect("mkdir");
    fs::write(
        dir.path().join("FR/conges.txt"),
        "Employees in France receive 25 paid vacation days per year.",
    )
    .expect("write");
    fs::write(
        dir.path().join("DE/urlaub.txt"),
        "Employees in Germany receive 20 paid vacation days per year.",
    )
    .expect("write");
    dir
}

fn engine_over(corpus: &TempDir) -> RetrievalEngine {
    let mut config = RetrievalConfig::default();
    config.embedding.dim = DIM;
    config.chunking.max_tokens = 32;
    config.chunking.overlap_tokens = 4;
    config.gate.min_score_threshold = 0.1;
    let engine = RetrievalEngine::new(config, Box::new(HashEmbedder::new(DIM))).expect("engine");
    engine.build_index(corpus.path()).expect("ingest");
    engine
}

#[test]
fn hit_rate_counts_matching_doc_hints() {
    let corpus = corpus();
    let engine = engine_over(&corpus);

    let dataset = TempDir::new().expect("tempdir");
    let path = dataset.path().join("eval.jsonl");
    fs::write(
        &path,
        concat!(
            r#"{"id":"q1","question":"How many vacation days in France?","filters":{"country":"FR"},"expected_doc_hint":"FR_"}"#,
            "\n\n",
            r#"{"id":"q2","question":"vacation days","filters":{"country":["FR","DE"]},"expected_doc_hint":"ZZ_"}"#,
            "\n",
        ),
    )
    .expect("write");

    let cases = eval::read_cases(&path).expect("read");
    assert_eq!(cases.len(), 2);

    let summary = eval::run(&engine, &cases, 5).expect("eval");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.hits, 1);
    assert!(summary.outcomes[0].hit);
    assert!(summary.outcomes[0]
        .top_docs
        .iter()
        .all(|d| d.starts_with("FR_")));
    assert!(!summary.outcomes[1].hit);
    assert!((summary.hit_rate() - 0.5).abs() < 1e-9);
}

#[test]
fn unsupported_filter_value_is_rejected() {
    let corpus = corpus();
    let engine = engine_over(&corpus);

    let dataset = TempDir::new().expect("tempdir");
    let path = dataset.path().join("eval.jsonl");
    fs::write(
        &path,
        r#"{"id":"q1","question":"vacation days","filters":{"country":{"eq":"FR"}}}"#,
    )
    .expect("write");

    let cases = eval::read_cases(&path).expect("read");
    let err = eval::run(&engine, &cases, 5).expect_err("bad filter");
    assert!(matches!(err, Error::InvalidFilter(_)));
}
