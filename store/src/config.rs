use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "data/trading_pairs.db";

/// Configuration for the SQLite price store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database file, or `:memory:` for a throwaway store
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a new store configuration from environment variables
    pub fn from_env() -> Self {
        std::env::var("PRICE_DB_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(Self::new)
            .unwrap_or_default()
    }

    pub fn is_in_memory(&self) -> bool {
        self.path.as_os_str() == ":memory:"
    }
}
