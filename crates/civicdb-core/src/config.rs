//! Configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (with `__` as the nesting separator), then the conventional
//! `OPENAI_API_KEY`/`EMBEDDING_MODEL` variables. Typed sections are extracted
//! into [`Settings`]; scoring code only ever sees the structs, never the
//! environment.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Upper bound on sections returned by either retrieval path.
pub const MAX_RESULTS: usize = 3;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let config = Self::from_figment(Self::figment_for(&env_name));
        config.settings()?;
        Ok(config)
    }

    pub fn figment_for(env_name: &str) -> Figment {
        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment
            .merge(Env::prefixed("APP_").split("__"))
            .merge(Env::raw().only(&["OPENAI_API_KEY", "EMBEDDING_MODEL"]).map(|key| {
                if key.as_str().eq_ignore_ascii_case("OPENAI_API_KEY") {
                    "embedding.api_key".into()
                } else {
                    "embedding.model".into()
                }
            }))
    }

    pub fn from_figment(figment: Figment) -> Self {
        Self { figment }
    }

    /// Extract and validate every typed section. Missing keys take defaults.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to extract settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalConfig,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        self.retrieval.validate()?;
        if self.embedding.timeout_ms == 0 {
            return Err(Error::InvalidConfig("embedding.timeout_ms must be positive".to_string()));
        }
        if self.embedding.provider == ProviderKind::Fake && self.embedding.fake_dim == 0 {
            return Err(Error::InvalidConfig("embedding.fake_dim must be positive".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    /// JSON corpus snapshot read by `ask` and written by ingest/backfill.
    pub snapshot_path: String,
    /// Default dataset for `ingest` when no path is given.
    pub dataset_path: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            snapshot_path: "data/civic-snapshot.json".to_string(),
            dataset_path: "data/civic-documents.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI-compatible `/v1/embeddings` endpoint; disabled without an API key.
    OpenAi,
    /// Deterministic hashed embeddings for offline development and tests.
    Fake,
    /// Semantic search switched off; every question takes the keyword path.
    #[serde(rename = "none")]
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout_ms: u64,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: None,
            model: "text-embedding-3-small".to_string(),
            endpoint: "https://api.openai.com/v1/embeddings".to_string(),
            timeout_ms: 10_000,
            fake_dim: 256,
        }
    }
}

/// Everything the orchestrator needs, passed in at construction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Sections returned per answer, at most [`MAX_RESULTS`].
    pub limit: usize,
    /// Bound on each network step of the vector path (embed, then query).
    pub request_timeout_ms: u64,
    pub thresholds: ConfidenceThresholds,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { limit: MAX_RESULTS, request_timeout_ms: 10_000, thresholds: ConfidenceThresholds::default() }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 || self.limit > MAX_RESULTS {
            return Err(Error::InvalidConfig(format!(
                "retrieval.limit must be between 1 and {}, got {}",
                MAX_RESULTS, self.limit
            )));
        }
        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig("retrieval.request_timeout_ms must be positive".to_string()));
        }
        self.thresholds.validate()
    }
}

/// Empirical tuning constants for confidence bands.
///
/// Lexical bands apply to the summed score of the returned matches; distance
/// bands apply to the best match only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceThresholds {
    pub lexical_high: u32,
    pub lexical_medium: u32,
    pub distance_high: f64,
    pub distance_medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self { lexical_high: 8, lexical_medium: 4, distance_high: 0.22, distance_medium: 0.35 }
    }
}

impl ConfidenceThresholds {
    pub fn validate(&self) -> Result<()> {
        if self.lexical_medium > self.lexical_high {
            return Err(Error::InvalidConfig(format!(
                "lexical_medium ({}) exceeds lexical_high ({})",
                self.lexical_medium, self.lexical_high
            )));
        }
        if !(self.distance_high.is_finite() && self.distance_medium.is_finite())
            || self.distance_high > self.distance_medium
        {
            return Err(Error::InvalidConfig(format!(
                "distance thresholds must be finite with high ({}) <= medium ({})",
                self.distance_high, self.distance_medium
            )));
        }
        Ok(())
    }
}

/// Expand `~` and `$VAR`/`${VAR}` in a configured path. Unknown variables are
/// left as written; nothing is canonicalized.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
