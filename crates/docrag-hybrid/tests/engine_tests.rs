use std::fs;
use std::sync::Arc;
use std::time::{Duration, Instant};

use docrag_core::config::RetrievalConfig;
use docrag_core::error::{Error, Result};
use docrag_core::filter::{Filter, FilterPredicate, MetaValue};
use docrag_core::traits::Embedder;
use docrag_embed::HashEmbedder;
use docrag_hybrid::{Deadline, RetrievalEngine};
use tempfile::TempDir;

const DIM: usize = 64;

fn test_config() -> RetrievalConfig {
    let mut config = RetrievalConfig::default();
    config.embedding.dim = DIM;
    config.chunking.max_tokens = 32;
    config.chunking.overlap_tokens = 4;
    config.gate.min_score_threshold = 0.1;
    config
}

fn engine() -> RetrievalEngine {
    RetrievalEngine::new(test_config(), Box::new(HashEmbedder::new(DIM))).expect("engine")
}

fn write_corpus(dir: &TempDir) {
    fs::create_dir_all(dir.path().join("FR")).expect("mkdir");
    fs::create_dir_all(dir.path().join("DE")).expect("mkdir");
    fs::write(
        dir.path().join("FR/conges.txt"),
        "Employees in France receive 25 paid vacation days per year. \
         Vacation days accrue monthly and unused vacation days may carry over once.",
    )
    .expect("write");
    fs::write(
        dir.path().join("DE/urlaub.txt"),
        "Employees in Germany receive 20 paid vacation days per year according to federal law.",
    )
    .expect("write");
}

fn country_filter(code: &str) -> Filter {
    let mut filter = Filter::new();
    filter.insert("country".into(), FilterPredicate::Eq(MetaValue::str(code)));
    filter
}

#[test]
fn retrieve_before_ingestion_fails() {
    let e = engine();
    let err = e
        .retrieve("vacation days", &Filter::new(), Deadline::none())
        .expect_err("no index yet");
    assert!(matches!(err, Error::IndexNotBuilt));
}

#[test]
fn ingest_then_retrieve_with_citations() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);
    let e = engine();
    assert_eq!(e.build_index(corpus.path()).expect("ingest"), 1);

    let evidence = e
        .retrieve(
            "How many vacation days in France?",
            &country_filter("FR"),
            Deadline::none(),
        )
        .expect("retrieve");

    assert!(evidence.sufficient);
    assert!(!evidence.citations.is_empty());
    for citation in &evidence.citations {
        assert!(citation.doc_id.starts_with("FR_"));
    }
    assert!(evidence.context.contains("::"));
}

#[test]
fn filtered_out_corpus_refuses_instead_of_failing() {
    let corpus = TempDir::new().expect("tempdir");
    // Only German documents, query pinned to FR.
    fs::create_dir_all(corpus.path().join("DE")).expect("mkdir");
    fs::write(
        corpus.path().join("DE/urlaub.txt"),
        "Vacation days in Germany: employees receive 20 paid vacation days per year.",
    )
    .expect("write");

    let e = engine();
    e.build_index(corpus.path()).expect("ingest");
    let evidence = e
        .retrieve(
            "vacation days",
            &country_filter("FR"),
            Deadline::none(),
        )
        .expect("retrieve");

    assert!(!evidence.sufficient);
    assert!(evidence.citations.is_empty());
}

#[test]
fn unknown_filter_key_is_an_error() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);
    let e = engine();
    e.build_index(corpus.path()).expect("ingest");

    let mut filter = Filter::new();
    filter.insert("region".into(), FilterPredicate::Eq(MetaValue::str("EU")));
    let err = e
        .retrieve("vacation days", &filter, Deadline::none())
        .expect_err("unknown key");
    assert!(matches!(err, Error::InvalidFilter(_)));
}

#[test]
fn reingesting_unchanged_corpus_is_idempotent() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);
    let e = engine();
    assert_eq!(e.build_index(corpus.path()).expect("first"), 1);
    let first = e
        .retrieve("vacation days in France", &Filter::new(), Deadline::none())
        .expect("retrieve");

    assert_eq!(e.build_index(corpus.path()).expect("second"), 2);
    let second = e
        .retrieve("vacation days in France", &Filter::new(), Deadline::none())
        .expect("retrieve");

    assert_eq!(second.generation, 2);
    let ids = |ev: &docrag_core::types::Evidence| {
        ev.chunks
            .iter()
            .map(|sc| (sc.chunk_id.clone(), sc.fused_score))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(&first), ids(&second));
}

#[test]
fn expired_deadline_cancels_retrieval() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);
    let e = engine();
    e.build_index(corpus.path()).expect("ingest");

    let past = Deadline::at(Instant::now() - Duration::from_millis(1));
    let err = e
        .retrieve("vacation days", &Filter::new(), past)
        .expect_err("deadline");
    assert!(matches!(err, Error::Cancelled));
}

struct FailingEmbedder;

impl Embedder for FailingEmbedder {
    fn dim(&self) -> usize {
        DIM
    }
    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::EmbeddingUnavailable("provider offline".into()))
    }
}

#[test]
fn embedding_outage_degrades_to_lexical_only() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);

    // Ingestion needs embeddings, so build with the working embedder and
    // hand the published index to an engine whose provider is down.
    let healthy = engine();
    healthy.build_index(corpus.path()).expect("ingest");
    let index_dir = TempDir::new().expect("tempdir");
    healthy.save_index(index_dir.path()).expect("save");

    let degraded =
        RetrievalEngine::new(test_config(), Box::new(FailingEmbedder)).expect("engine");
    degraded.load_index(index_dir.path()).expect("load");

    let evidence = degraded
        .retrieve("vacation days in France", &Filter::new(), Deadline::none())
        .expect("lexical-only retrieval");
    assert!(evidence.sufficient);
    for sc in &evidence.chunks {
        assert!(sc.dense_score.is_none());
    }

    let mut strict_config = test_config();
    strict_config.retrieval.lexical_fallback = false;
    let strict = RetrievalEngine::new(strict_config, Box::new(FailingEmbedder)).expect("engine");
    strict.load_index(index_dir.path()).expect("load");
    let err = strict
        .retrieve("vacation days", &Filter::new(), Deadline::none())
        .expect_err("no fallback");
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
}

#[test]
fn concurrent_searches_never_mix_generations() {
    let corpus = TempDir::new().expect("tempdir");
    write_corpus(&corpus);
    let e = Arc::new(engine());
    e.build_index(corpus.path()).expect("ingest");

    let mut workers = Vec::new();
    for _ in 0..4 {
        let e = Arc::clone(&e);
        workers.push(std::thread::spawn(move || {
            for _ in 0..50 {
                let evidence = e
                    .retrieve("vacation days", &Filter::new(), Deadline::none())
                    .expect("retrieve");
                // Generation 1 was built before IT/ferie.txt existed; seeing
                // one of its chunks under generation 1 would mean a query
                // observed two generations at once.
                if evidence.generation == 1 {
                    for sc in &evidence.chunks {
                        assert!(!sc.doc_id.starts_with("IT_"));
                    }
                }
            }
        }));
    }

    fs::create_dir_all(corpus.path().join("IT")).expect("mkdir");
    fs::write(
        corpus.path().join("IT/ferie.txt"),
        "Employees in Italy receive paid vacation days per year as well.",
    )
    .expect("write");
    assert_eq!(e.build_index(corpus.path()).expect("reingest"), 2);

    for worker in workers {
        worker.join().expect("worker");
    }
}
