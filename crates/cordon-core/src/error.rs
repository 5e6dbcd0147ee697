use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors produced while parsing and converting cordon's primitive data.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Input is not a dotted-quad IPv4 address
    #[error("invalid IPv4 address: {0}")]
    InvalidIp(String),

    /// Input is not a valid IPv4 CIDR or single address
    #[error("invalid IPv4 network: {0}")]
    InvalidNetwork(String),

    /// A tag is missing one of its mandatory fields
    #[error("tag missing mandatory field '{field}': {tag}")]
    TagField {
        /// The missing field name (`type` or `source`)
        field: &'static str,
        /// Serialized form of the offending tag
        tag: String,
    },

    /// A canonical staging or index line failed to parse
    #[error("malformed line: {reason}: {line}")]
    Line {
        /// What was wrong with the line
        reason: String,
        /// The offending line, truncated for logging
        line: String,
    },

    /// JSON parsing/serialization error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
