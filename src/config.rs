//! Service configuration read from the environment at startup

use anyhow::{Context, Result};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    pub model_path: String,
    pub default_k: usize,
    pub max_k: usize,
    pub max_candidates: usize,
    /// When set, every embedding must have exactly this length
    pub embedding_dim: Option<usize>,
    pub port: u16,
    pub request_timeout: Duration,
    /// Remote scoring service; replaces the local model when set
    pub relevance_service_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: "model_ranker.json".to_string(),
            default_k: 50,
            max_k: 200,
            max_candidates: 1000,
            embedding_dim: None,
            port: 8008,
            request_timeout: Duration::from_millis(10_000),
            relevance_service_url: None,
        }
    }
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            model_path: lookup("RANK_MODEL_PATH").unwrap_or(defaults.model_path),
            default_k: parse_or(&lookup, "RANK_DEFAULT_K", defaults.default_k)?,
            max_k: parse_or(&lookup, "RANK_MAX_K", defaults.max_k)?,
            max_candidates: parse_or(&lookup, "RANK_MAX_CANDIDATES", defaults.max_candidates)?,
            embedding_dim: parse_opt(&lookup, "RANK_EMBEDDING_DIM")?,
            port: parse_or(&lookup, "RANK_SERVICE_PORT", defaults.port)?,
            request_timeout: Duration::from_millis(parse_or(
                &lookup,
                "RANK_REQUEST_TIMEOUT_MS",
                defaults.request_timeout.as_millis() as u64,
            )?),
            relevance_service_url: lookup("RELEVANCE_SERVICE_URL").filter(|s| !s.is_empty()),
        };

        if config.default_k == 0 || config.default_k > config.max_k {
            anyhow::bail!(
                "RANK_DEFAULT_K must be in 1..={}, got {}",
                config.max_k,
                config.default_k
            );
        }

        if config.max_candidates == 0 {
            anyhow::bail!("RANK_MAX_CANDIDATES must be at least 1");
        }

        Ok(config)
    }
}

fn parse_opt<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("Invalid value for {}: '{}'", key, raw))
        })
        .transpose()
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_opt(lookup, key)?.unwrap_or(default))
}
