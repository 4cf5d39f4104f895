//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `APIMATCH_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_ADMISSION_TIMEOUT_MS, DEFAULT_MAX_IN_FLIGHT, DEFAULT_POOL_SIZE,
    DEFAULT_RETRIEVAL_TIMEOUT_MS, DEFAULT_TOP_K,
};

/// Process configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `APIMATCH_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Qdrant endpoint URL. Default: `http://localhost:6334`.
    pub qdrant_url: String,

    /// Collection holding the API catalog. Default: `api_catalog`.
    pub collection: String,

    /// OpenAI-compatible embeddings endpoint used to embed queries.
    pub embedding_url: String,

    /// Model name sent to the embeddings endpoint.
    pub embedding_model: String,

    /// Optional JSON ranking configuration (profiles, calibration ranges).
    pub ranking_config_path: Option<PathBuf>,

    /// Top-K used when a caller does not supply one. Default: `10`.
    pub default_top_k: usize,

    /// Maximum number of requests processed at once. Default: `64`.
    pub max_in_flight: usize,

    /// How long an over-limit request may wait for admission. Default: `250ms`.
    ///
    /// Zero rejects over-limit requests immediately.
    pub admission_timeout: Duration,

    /// Deadline for a single retrieval call. Default: `5s`.
    pub retrieval_timeout: Duration,

    /// Number of retrieval-backend handles in the pool. Default: `4`.
    pub pool_size: usize,
}

/// Default Qdrant URL used when `APIMATCH_QDRANT_URL` is not set.
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
/// Default collection used when `APIMATCH_COLLECTION` is not set.
pub const DEFAULT_COLLECTION: &str = "api_catalog";
/// Default embeddings endpoint used when `APIMATCH_EMBEDDING_URL` is not set.
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8081/v1/embeddings";
/// Default embedding model name.
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-MiniLM-L6-v2";

impl Default for Config {
    fn default() -> Self {
        Self {
            qdrant_url: DEFAULT_QDRANT_URL.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            ranking_config_path: None,
            default_top_k: DEFAULT_TOP_K,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            admission_timeout: Duration::from_millis(DEFAULT_ADMISSION_TIMEOUT_MS),
            retrieval_timeout: Duration::from_millis(DEFAULT_RETRIEVAL_TIMEOUT_MS),
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Config {
    const ENV_QDRANT_URL: &'static str = "APIMATCH_QDRANT_URL";
    const ENV_COLLECTION: &'static str = "APIMATCH_COLLECTION";
    const ENV_EMBEDDING_URL: &'static str = "APIMATCH_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "APIMATCH_EMBEDDING_MODEL";
    const ENV_RANKING_CONFIG: &'static str = "APIMATCH_RANKING_CONFIG";
    const ENV_DEFAULT_TOP_K: &'static str = "APIMATCH_DEFAULT_TOP_K";
    const ENV_MAX_IN_FLIGHT: &'static str = "APIMATCH_MAX_IN_FLIGHT";
    const ENV_ADMISSION_TIMEOUT_MS: &'static str = "APIMATCH_ADMISSION_TIMEOUT_MS";
    const ENV_RETRIEVAL_TIMEOUT_MS: &'static str = "APIMATCH_RETRIEVAL_TIMEOUT_MS";
    const ENV_POOL_SIZE: &'static str = "APIMATCH_POOL_SIZE";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let qdrant_url = Self::parse_string_from_env(Self::ENV_QDRANT_URL, defaults.qdrant_url);
        let collection = Self::parse_string_from_env(Self::ENV_COLLECTION, defaults.collection);
        let embedding_url =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_URL, defaults.embedding_url);
        let embedding_model =
            Self::parse_string_from_env(Self::ENV_EMBEDDING_MODEL, defaults.embedding_model);
        let ranking_config_path = Self::parse_optional_path_from_env(Self::ENV_RANKING_CONFIG);
        let default_top_k =
            Self::parse_u64_from_env(Self::ENV_DEFAULT_TOP_K, defaults.default_top_k as u64)?
                as usize;
        let max_in_flight =
            Self::parse_u64_from_env(Self::ENV_MAX_IN_FLIGHT, defaults.max_in_flight as u64)?
                as usize;
        let admission_timeout = Duration::from_millis(Self::parse_u64_from_env(
            Self::ENV_ADMISSION_TIMEOUT_MS,
            defaults.admission_timeout.as_millis() as u64,
        )?);
        let retrieval_timeout = Duration::from_millis(Self::parse_u64_from_env(
            Self::ENV_RETRIEVAL_TIMEOUT_MS,
            defaults.retrieval_timeout.as_millis() as u64,
        )?);
        let pool_size =
            Self::parse_u64_from_env(Self::ENV_POOL_SIZE, defaults.pool_size as u64)? as usize;

        Ok(Self {
            qdrant_url,
            collection,
            embedding_url,
            embedding_model,
            ranking_config_path,
            default_top_k,
            max_in_flight,
            admission_timeout,
            retrieval_timeout,
            pool_size,
        })
    }

    /// Validates limits and paths (does not touch the network).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: Self::ENV_QDRANT_URL,
            });
        }
        if self.collection.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: Self::ENV_COLLECTION,
            });
        }
        if self.embedding_url.trim().is_empty() {
            return Err(ConfigError::EmptyValue {
                name: Self::ENV_EMBEDDING_URL,
            });
        }

        if self.default_top_k == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_DEFAULT_TOP_K,
            });
        }
        if self.max_in_flight == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_MAX_IN_FLIGHT,
            });
        }
        if self.retrieval_timeout.is_zero() {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_RETRIEVAL_TIMEOUT_MS,
            });
        }
        if self.pool_size == 0 {
            return Err(ConfigError::MustBePositive {
                name: Self::ENV_POOL_SIZE,
            });
        }

        if let Some(ref path) = self.ranking_config_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        Ok(())
    }

    fn parse_optional_path_from_env(var_name: &str) -> Option<PathBuf> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &'static str, default: u64) -> Result<u64, ConfigError> {
        match env::var(var_name) {
            Ok(value) => value
                .trim()
                .parse()
                .map_err(|e| ConfigError::InvalidNumber {
                    name: var_name,
                    value,
                    source: e,
                }),
            Err(_) => Ok(default),
        }
    }
}
