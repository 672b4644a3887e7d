use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one index store
#[derive(Clone, Debug)]
pub struct StoreConfig {
    /// Directory holding the index files and the path catalogue
    pub root: PathBuf,
    /// Short tag used when encoding result ids (e.g. "file")
    pub store_type: String,
    /// Content types this store claims; routing matches against these
    pub types: Vec<String>,
    pub commit: CommitConfig,
    pub retry: RetryConfig,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>, store_type: impl Into<String>) -> Self {
        let store_type = store_type.into();
        Self {
            root: root.into(),
            types: vec![store_type.clone()],
            store_type,
            commit: CommitConfig::default(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_types(mut self, types: Vec<String>) -> Self {
        self.types = types;
        self
    }
}

/// Commit queue timer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommitConfig {
    /// One-shot timer restarted on each enqueue; merges bursts
    pub small_interval_ms: u64,
    /// One-shot timer started per commit cycle; bounds worst-case latency
    pub large_interval_ms: u64,
}

impl Default for CommitConfig {
    fn default() -> Self {
        Self {
            small_interval_ms: 200,
            large_interval_ms: 10_000,
        }
    }
}

impl CommitConfig {
    pub fn small_interval(&self) -> Duration {
        Duration::from_millis(self.small_interval_ms)
    }

    pub fn large_interval(&self) -> Duration {
        Duration::from_millis(self.large_interval_ms)
    }
}

/// Retry budget for writer acquisition and catalogue contention
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: u32,
    /// First backoff delay; doubled on each further attempt
    pub backoff_base_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Backoff before the given (1-based) retry attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_base_ms << attempt.min(10))
    }
}

/// Tokenizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub fold_accents: bool,
    pub max_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            fold_accents: true,
            max_token_length: 255,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let commit = CommitConfig::default();
        assert_eq!(commit.small_interval(), Duration::from_millis(200));
        assert_eq!(commit.large_interval(), Duration::from_secs(10));

        let retry = RetryConfig::default();
        assert_eq!(retry.max_attempts, 5);
        assert!(retry.backoff(2) > retry.backoff(1));
    }

    #[test]
    fn test_store_config_types() {
        let config = StoreConfig::new("/tmp/idx", "file");
        assert_eq!(config.types, vec!["file".to_string()]);

        let config = config.with_types(vec!["File".into(), "Audio".into()]);
        assert_eq!(config.types.len(), 2);
    }
}
