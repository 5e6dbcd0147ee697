use thiserror::Error;

/// Result type alias for feed operations
pub type Result<T> = std::result::Result<T, FeedError>;

/// Errors that can occur while fetching and staging a feed.
#[derive(Error, Debug)]
pub enum FeedError {
    /// HTTP request failed after all retries
    #[error("fetch failed for {feed}: {reason}")]
    Fetch {
        /// The feed that failed
        feed: String,
        /// Why the final attempt failed
        reason: String,
    },

    /// The remote endpoint answered with a non-success status
    #[error("feed endpoint returned HTTP {status}: {url}")]
    Status {
        /// HTTP status code
        status: u16,
        /// The requested URL
        url: String,
    },

    /// A downloaded archive could not be opened or lacked the expected entry
    #[error("archive error: {0}")]
    Archive(String),

    /// CSV row decoding failed
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// The staged file failed structural validation
    #[error("staged file invalid for {feed}: {reason}")]
    Validation {
        /// The feed whose output is invalid
        feed: String,
        /// What the validator found
        reason: String,
    },

    /// A feed needs configuration it was not given (e.g. a license key)
    #[error("feed {feed} not configured: {reason}")]
    NotConfigured {
        /// The unconfigured feed
        feed: String,
        /// What is missing
        reason: String,
    },

    /// IO error while writing or reading staging files
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON decoding of a structured feed failed
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core codec error
    #[error(transparent)]
    Core(#[from] cordon_core::CoreError),
}
