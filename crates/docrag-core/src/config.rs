//! Configuration loading and validation.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env
//! vars into a typed [`RetrievalConfig`]. Every load is validated up front
//! so scoring code never has to re-check parameter ranges.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens: 200,
            overlap_tokens: 40,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalParams {
    pub top_k_lexical: usize,
    pub top_k_dense: usize,
    pub top_k_final: usize,
    /// Weight of the dense side in fusion: 0 = pure lexical, 1 = pure dense.
    pub alpha: f32,
    /// Degrade to lexical-only ranking when the embedding provider fails.
    pub lexical_fallback: bool,
    /// Per-query budget in milliseconds; 0 disables the deadline.
    pub timeout_ms: u64,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            top_k_lexical: 12,
            top_k_dense: 8,
            top_k_final: 8,
            alpha: 0.55,
            lexical_fallback: true,
            timeout_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Fused-score cutoff; a chunk scoring exactly at the threshold counts.
    pub min_score_threshold: f32,
    pub min_evidence_count: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_score_threshold: 0.25,
            min_evidence_count: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub dim: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub corpus_dir: String,
    pub index_dir: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            corpus_dir: "data/corpus".into(),
            index_dir: "data/index".into(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalParams,
    pub gate: GateConfig,
    pub embedding: EmbeddingConfig,
    pub data: DataConfig,
}

impl RetrievalConfig {
    /// Load and validate configuration for the current `RUST_ENV`.
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(RetrievalConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config: RetrievalConfig = figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject out-of-range parameters before they reach scoring code.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.max_tokens == 0 {
            return Err(Error::InvalidConfig("chunking.max_tokens must be positive".into()));
        }
        if self.chunking.overlap_tokens >= self.chunking.max_tokens {
            return Err(Error::InvalidConfig(format!(
                "chunking.overlap_tokens ({}) must be smaller than chunking.max_tokens ({})",
                self.chunking.overlap_tokens, self.chunking.max_tokens
            )));
        }
        if !(0.0..=1.0).contains(&self.retrieval.alpha) {
            return Err(Error::InvalidConfig(format!(
                "retrieval.alpha ({}) must lie in [0, 1]",
                self.retrieval.alpha
            )));
        }
        if self.retrieval.top_k_final == 0 {
            return Err(Error::InvalidConfig("retrieval.top_k_final must be positive".into()));
        }
        if self.gate.min_evidence_count == 0 {
            return Err(Error::InvalidConfig("gate.min_evidence_count must be positive".into()));
        }
        if self.embedding.dim == 0 {
            return Err(Error::InvalidConfig("embedding.dim must be positive".into()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RetrievalConfig::default().validate().expect("defaults");
    }

    #[test]
    fn alpha_out_of_range_is_rejected() {
        let mut cfg = RetrievalConfig::default();
        cfg.retrieval.alpha = 1.5;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn overlap_must_stay_below_window() {
        let mut cfg = RetrievalConfig::default();
        cfg.chunking.overlap_tokens = cfg.chunking.max_tokens;
        assert!(matches!(cfg.validate(), Err(Error::InvalidConfig(_))));
    }
}
