//! Metadata values and query-time filters.
//!
//! Metadata is a closed tagged-value type rather than free-form JSON so that
//! equality and membership have one explicit evaluator. Filters are applied
//! to the candidate set *before* scoring; a filtered-out chunk can never
//! occupy a top-k slot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::Meta;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetaValue {
    Str(String),
    Num(f64),
    Date(NaiveDate),
    Flag(bool),
}

impl MetaValue {
    pub fn str<S: Into<String>>(s: S) -> Self {
        MetaValue::Str(s.into())
    }
}

/// Equality or membership test against one metadata key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterPredicate {
    Eq(MetaValue),
    OneOf(Vec<MetaValue>),
}

impl FilterPredicate {
    pub fn matches(&self, value: &MetaValue) -> bool {
        match self {
            FilterPredicate::Eq(expected) => expected == value,
            FilterPredicate::OneOf(allowed) => allowed.iter().any(|v| v == value),
        }
    }
}

/// Conjunction of per-key predicates. An empty filter matches everything.
pub type Filter = BTreeMap<String, FilterPredicate>;

/// True when every predicate is satisfied by the chunk metadata.
/// A predicate on a key the chunk does not carry fails the match.
pub fn matches(filter: &Filter, metadata: &Meta) -> bool {
    filter.iter().all(|(key, predicate)| {
        metadata
            .get(key)
            .is_some_and(|value| predicate.matches(value))
    })
}
