use thiserror::Error;

/// Domain error taxonomy shared by all engines.
///
/// Insufficient evidence is deliberately *not* represented here: a refusal is
/// a successful `Evidence { sufficient: false }`, never an error, so callers
/// can always tell "no answer" apart from "something broke".
#[derive(Debug, Error)]
pub enum Error {
    #[error("Empty document: {0}")]
    EmptyDocument(String),

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Index not built: ingest a corpus before querying")]
    IndexNotBuilt,

    #[error("Embedding unavailable: {0}")]
    EmbeddingUnavailable(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cancelled: deadline exceeded")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
