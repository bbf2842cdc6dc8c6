//! docrag-hybrid
//!
//! Query-time fusion of the lexical and dense engines, the evidence
//! sufficiency gate, index generations with atomic publish, persistence,
//! and the `RetrievalEngine` facade the rest of the system calls.

pub mod deadline;
pub mod engine;
pub mod eval;
pub mod fusion;
pub mod gate;
pub mod generation;
pub mod persist;
pub mod prompt;

pub use deadline::Deadline;
pub use engine::RetrievalEngine;
pub use generation::{GenerationStore, IndexGeneration};
pub use persist::Manifest;
