use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("fetch failed for {platform} page {page}: {cause}")]
    Fetch {
        platform: String,
        page: u32,
        cause: String,
    },

    #[error("unrecognized markup for {platform} page {page}")]
    Parse { platform: String, page: u32 },

    #[error("record from {platform} has no identifying data")]
    IncompleteRecord { platform: String },

    #[error("{check} check timed out after {timeout_ms}ms")]
    ValidationTimeout { check: String, timeout_ms: u64 },

    #[error("every configured source failed on its first page")]
    NoSourceAvailable,
}

impl ScraperError {
    /// Per-page and per-record errors are recovered by skipping; only an
    /// all-sources-dead run aborts.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ScraperError::NoSourceAvailable)
    }
}

pub type Result<T> = std::result::Result<T, ScraperError>;
