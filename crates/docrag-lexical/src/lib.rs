//! docrag-lexical
//!
//! Inverted-index BM25 scoring over chunk text. See `index` for the posting
//! layout and `tokenize` for the shared query/document tokenizer.

pub mod index;
pub mod tokenize;

pub use index::{LexicalIndex, Posting};
pub use tokenize::{normalize_whitespace, tokenize};
