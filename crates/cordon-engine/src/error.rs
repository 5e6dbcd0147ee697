use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the cordon engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A lookup was asked about something that is not a dotted-quad IPv4
    #[error("invalid IPv4 address: {0}")]
    InvalidIp(String),

    /// The merged intermediate file failed structural validation
    #[error("merge validation failed: {0}")]
    MergeValidation(String),

    /// The loaded dataset failed an integrity check (empty temp index,
    /// post-swap cardinality mismatch)
    #[error("flattener integrity check failed: {0}")]
    FlattenIntegrity(String),

    /// The update exceeded its overall timeout
    #[error("update timed out after {0} seconds")]
    UpdateTimeout(u64),

    /// A feed declared fatal failed
    #[error("feed {feed} failed fatally: {reason}")]
    FeedFatal {
        /// The aborting feed
        feed: String,
        /// Why it failed
        reason: String,
    },

    /// The cron expression or timezone could not be parsed
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Configuration is invalid
    #[error("config error: {0}")]
    Config(String),

    /// External DNSBL query failed
    #[error("dnsbl query failed: {0}")]
    Dnsbl(String),

    /// Core codec error
    #[error(transparent)]
    Core(#[from] cordon_core::CoreError),

    /// Feed plugin error
    #[error(transparent)]
    Feed(#[from] cordon_feeds::FeedError),

    /// Store backend error
    #[error("store error: {0}")]
    Store(#[from] cordon_store::StoreError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
