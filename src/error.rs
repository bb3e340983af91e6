use thiserror::Error;

/// Startup failures while reading the function's environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} must be a non-negative integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

/// Why a single message did not reach the topic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The broker accepted the batch but refused this entry.
    #[error("rejected by topic ({code}): {message}")]
    Rejected { code: String, message: String },

    /// The whole batch request failed, so every entry in it failed.
    #[error("publish request failed: {0}")]
    Request(String),

    #[error("invalid batch entry: {0}")]
    InvalidEntry(String),

    #[error("no receipt returned for entry")]
    MissingReceipt,
}
