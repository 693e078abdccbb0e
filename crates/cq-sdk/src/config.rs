use std::path::{Path, PathBuf};
use std::time::Duration;

use cq_ledger::Concurrency;
use cq_quiz::DEFAULT_POINTS_PER_CORRECT;
use cq_store::gcs::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};

use crate::error::{SdkError, SdkResult};

/// Top-level configuration, usually read from `cinequiz.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub ledger: LedgerSection,
    pub quiz: QuizConfig,
    pub retry: RetryConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: BackendConfig,
    /// Bucket holding `users/{id}.json`.
    pub users_bucket: String,
    /// Bucket holding the question pool and the cinema catalog.
    pub content_bucket: String,
    /// Upper bound on a single store call.
    pub timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendConfig::default(),
            users_bucket: "cinequiz".to_string(),
            content_bucket: "cinequiz".to_string(),
            timeout_ms: 10_000,
        }
    }
}

impl StorageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_token_env() -> String {
    "CQ_ACCESS_TOKEN".to_string()
}

/// Which object store to talk to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Process-local store, gone when the process exits.
    #[default]
    Memory,
    /// Local directory, one subdirectory per bucket.
    Fs { root: PathBuf },
    /// Google Cloud Storage.
    Gcs {
        #[serde(default = "default_base_url")]
        base_url: String,
        #[serde(default)]
        project: Option<String>,
        /// Environment variable holding the bearer token.
        #[serde(default = "default_token_env")]
        token_env: String,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub concurrency: Concurrency,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizConfig {
    pub questions_per_session: usize,
    pub points_per_correct: u64,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            questions_per_session: 3,
            points_per_correct: DEFAULT_POINTS_PER_CORRECT,
        }
    }
}

/// Caller-side retry policy for reads. Ledger mutations are never retried.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            min_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

impl AppConfig {
    /// Read and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SdkResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| SdkError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
            .map_err(|e| SdkError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_toml_str(text: &str) -> SdkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| SdkError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> SdkResult<String> {
        toml::to_string_pretty(self).map_err(|e| SdkError::Config(e.to_string()))
    }

    pub fn validate(&self) -> SdkResult<()> {
        if self.storage.timeout_ms == 0 {
            return Err(SdkError::Config("storage.timeout_ms must be positive".into()));
        }
        if self.storage.users_bucket.is_empty() || self.storage.content_bucket.is_empty() {
            return Err(SdkError::Config("bucket names must not be empty".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(SdkError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.min_delay_ms > self.retry.max_delay_ms {
            return Err(SdkError::Config(
                "retry.min_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }
        Ok(())
    }
}
