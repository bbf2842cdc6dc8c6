use std::env;
use std::path::PathBuf;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use docrag_core::config::{expand_path, RetrievalConfig};
use docrag_core::filter::{Filter, FilterPredicate, MetaValue};
use docrag_embed::get_default_embedder;
use docrag_hybrid::eval;
use docrag_hybrid::prompt::build_prompt;
use docrag_hybrid::{Deadline, RetrievalEngine};

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ingest|query> [args...]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

/// Parse trailing `key=value` pairs into a metadata filter.
/// `key=a|b` becomes a membership test.
fn parse_filters(args: &[String]) -> anyhow::Result<Filter> {
    let mut filter = Filter::new();
    for arg in args {
        let (key, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("expected key=value, got '{arg}'"))?;
        let predicate = if value.contains('|') {
            FilterPredicate::OneOf(value.split('|').map(MetaValue::str).collect())
        } else {
            FilterPredicate::Eq(MetaValue::str(value))
        };
        filter.insert(key.to_string(), predicate);
    }
    Ok(filter)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = RetrievalConfig::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (cmd, args) = parse_args();

    match cmd.as_str() {
        "ingest" => {
            let corpus_dir = args
                .first()
                .map(PathBuf::from)
                .unwrap_or_else(|| expand_path(&config.data.corpus_dir));
            let index_dir = expand_path(&config.data.index_dir);

            let embedder = get_default_embedder(config.embedding.dim);
            let engine = RetrievalEngine::new(config, embedder)?;

            println!("Ingesting from {}", corpus_dir.display());
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
            pb.enable_steady_tick(Duration::from_millis(120));
            pb.set_message("chunking, embedding and indexing...");
            let generation = engine.build_index(&corpus_dir)?;
            pb.set_message("writing index to disk...");
            engine.save_index(&index_dir)?;
            pb.finish_and_clear();
            println!(
                "Ingest complete (generation {generation}, index at {})",
                index_dir.display()
            );
        }
        "query" => {
            let question = args.first().cloned().unwrap_or_else(|| {
                eprintln!("Usage: docrag query \"<question>\" [key=value ...]");
                std::process::exit(1)
            });
            let filter = parse_filters(&args[1..])?;
            let index_dir = expand_path(&config.data.index_dir);
            let timeout_ms = config.retrieval.timeout_ms;

            let embedder = get_default_embedder(config.embedding.dim);
            let engine = RetrievalEngine::new(config, embedder)?;
            engine.load_index(&index_dir)?;

            let evidence =
                engine.retrieve(&question, &filter, Deadline::from_timeout_ms(timeout_ms))?;
            let request = build_prompt(&question, &evidence);

            if !evidence.sufficient {
                println!("Insufficient evidence; generation must refuse.");
                println!(".. refusal prompt prepared ({} chars)", request.user.len());
            } else {
                println!("Evidence (generation {}):", evidence.generation);
                for sc in &evidence.chunks {
                    println!(
                        "  {:>6.3}  {}  (lexical {:?}, dense {:?})",
                        sc.fused_score, sc.chunk_id, sc.lexical_score, sc.dense_score
                    );
                }
                println!("Citations:");
                for citation in &evidence.citations {
                    println!("  [{}::{}]", citation.doc_id, citation.chunk_id);
                }
                println!("\n{}", evidence.context);
            }
        }
        "eval" => {
            let dataset = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: docrag eval <dataset.jsonl> [k]");
                std::process::exit(1)
            });
            let k: usize = args.get(1).map(|s| s.parse()).transpose()?.unwrap_or(5);
            let index_dir = expand_path(&config.data.index_dir);

            // The ranking must be at least k deep for hit rate at k.
            let mut config = config;
            config.retrieval.top_k_final = config.retrieval.top_k_final.max(k);
            let embedder = get_default_embedder(config.embedding.dim);
            let engine = RetrievalEngine::new(config, embedder)?;
            engine.load_index(&index_dir)?;

            let cases = eval::read_cases(&dataset)?;
            let summary = eval::run(&engine, &cases, k)?;
            println!(
                "Hit rate@{k}: {:.3} ({}/{})",
                summary.hit_rate(),
                summary.hits,
                summary.total
            );
            for outcome in &summary.outcomes {
                println!(
                    "  {}  {}  [{}]",
                    if outcome.hit { "ok  " } else { "miss" },
                    outcome.id.as_deref().unwrap_or("-"),
                    outcome.top_docs.join(", ")
                );
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}
