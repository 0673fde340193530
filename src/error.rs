//! Error types for the screening pipeline

use thiserror::Error;

/// Result type alias using our custom Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the screener
///
/// Upstream data failures are deliberately NOT errors: the cascade and the
/// scorer convert them to conservative defaults plus flags. Only contract
/// violations and configuration problems surface here.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Contract errors - one bad candidate must never halt a batch, so the
    // scan orchestrator catches these per token
    #[error("Invalid token address: {0}")]
    InvalidAddress(String),

    // Provider errors (propagated only when truly unexpected)
    #[error("Provider error from {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Fetch timed out after {0}ms")]
    FetchTimeout(u64),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(String),
}

impl Error {
    /// Check if this error is a per-fetch failure that the cascade
    /// handles with a default instead of aborting the pipeline
    pub fn is_data_unavailable(&self) -> bool {
        matches!(self, Error::Provider { .. } | Error::FetchTimeout(_))
    }

    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

/// Validate a base58 Solana-style address
pub fn validate_address(addr: &str) -> Result<()> {
    let bytes = bs58::decode(addr)
        .into_vec()
        .map_err(|_| Error::InvalidAddress(addr.to_string()))?;
    if bytes.len() != 32 {
        return Err(Error::InvalidAddress(addr.to_string()));
    }
    Ok(())
}
