//! Retrieval quality evaluation.
//!
//! Replays a JSONL dataset of labelled questions against a loaded index and
//! reports the hit rate at k: a case counts as a hit when any of the top-k
//! retrieved doc ids contains the expected document hint.

use serde::Deserialize;
use std::fs;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::info;

use docrag_core::error::{Error, Result};
use docrag_core::filter::{Filter, FilterPredicate, MetaValue};

use crate::deadline::Deadline;
use crate::engine::RetrievalEngine;

/// One labelled question, one JSON object per dataset line.
///
/// `filters` uses plain JSON values: a string is an equality test, an array
/// of strings a membership test.
#[derive(Debug, Deserialize)]
pub struct EvalCase {
    #[serde(default)]
    pub id: Option<String>,
    pub question: String,
    #[serde(default)]
    pub filters: serde_json::Map<String, serde_json::Value>,
    /// Substring expected in at least one of the top-k doc ids.
    #[serde(default)]
    pub expected_doc_hint: String,
}

#[derive(Debug)]
pub struct CaseOutcome {
    pub id: Option<String>,
    pub hit: bool,
    pub top_docs: Vec<String>,
}

#[derive(Debug)]
pub struct EvalSummary {
    pub total: usize,
    pub hits: usize,
    pub outcomes: Vec<CaseOutcome>,
}

impl EvalSummary {
    pub fn hit_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.hits as f64 / self.total as f64
        }
    }
}

/// Read a JSONL dataset, skipping blank lines.
pub fn read_cases(path: &Path) -> Result<Vec<EvalCase>> {
    let mut cases = Vec::new();
    for line in BufReader::new(fs::File::open(path)?).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        cases.push(serde_json::from_str(&line)?);
    }
    Ok(cases)
}

/// Run every case through `retrieve` and score the top-k doc ids.
pub fn run(engine: &RetrievalEngine, cases: &[EvalCase], k: usize) -> Result<EvalSummary> {
    let mut outcomes = Vec::with_capacity(cases.len());
    let mut hits = 0usize;
    for case in cases {
        let filter = case_filter(case)?;
        let evidence = engine.retrieve(&case.question, &filter, Deadline::none())?;
        let top_docs: Vec<String> = evidence
            .chunks
            .iter()
            .take(k)
            .map(|sc| sc.doc_id.clone())
            .collect();
        let hit = top_docs.iter().any(|d| d.contains(&case.expected_doc_hint));
        hits += usize::from(hit);
        outcomes.push(CaseOutcome {
            id: case.id.clone(),
            hit,
            top_docs,
        });
    }
    let summary = EvalSummary {
        total: cases.len(),
        hits,
        outcomes,
    };
    info!(
        total = summary.total,
        hits = summary.hits,
        k,
        "evaluation finished"
    );
    Ok(summary)
}

fn case_filter(case: &EvalCase) -> Result<Filter> {
    let mut filter = Filter::new();
    for (key, value) in &case.filters {
        filter.insert(key.clone(), predicate_from(key, value)?);
    }
    Ok(filter)
}

fn predicate_from(key: &str, value: &serde_json::Value) -> Result<FilterPredicate> {
    match value {
        serde_json::Value::String(s) => Ok(FilterPredicate::Eq(MetaValue::str(s.clone()))),
        serde_json::Value::Bool(b) => Ok(FilterPredicate::Eq(MetaValue::Flag(*b))),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(|f| FilterPredicate::Eq(MetaValue::Num(f)))
            .ok_or_else(|| Error::InvalidFilter(format!("non-finite number for '{key}'"))),
        serde_json::Value::Array(items) => {
            let mut allowed = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    serde_json::Value::String(s) => allowed.push(MetaValue::str(s.clone())),
                    other => {
                        return Err(Error::InvalidFilter(format!(
                            "unsupported member {other} in filter '{key}'"
                        )))
                    }
                }
            }
            Ok(FilterPredicate::OneOf(allowed))
        }
        other => Err(Error::InvalidFilter(format!(
            "unsupported value {other} for filter '{key}'"
        ))),
    }
}
