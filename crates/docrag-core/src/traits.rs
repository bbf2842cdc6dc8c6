use crate::error::Result;

/// Seam to the external embedding provider.
///
/// Implementations map text to fixed-length vectors of `dim()` components.
/// A provider outage surfaces as `Error::EmbeddingUnavailable`; the engine
/// decides whether that degrades the query to lexical-only ranking or
/// fails it, depending on configuration.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
}
