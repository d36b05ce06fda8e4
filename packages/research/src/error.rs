//! Typed errors for the research library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! fatal stage failure apart from the per-item failures the pipeline absorbs.

use thiserror::Error;

use crate::jobs::JobStatus;

/// Errors that can abort a pipeline run or a collaborator call.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage failed outright; the run is aborted.
    #[error("stage '{stage}' failed: {reason}")]
    Stage { stage: &'static str, reason: String },

    /// Search provider call failed
    #[error("search error: {0}")]
    Search(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Fetch operation failed
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// Language model unavailable or failed
    #[error("language model error: {0}")]
    Model(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Model output could not be interpreted
    #[error("unparseable model output: {0}")]
    Unparseable(String),

    /// A write-once state field was written twice
    #[error("state field '{field}' already set")]
    AlreadySet { field: &'static str },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Configuration error (missing credentials, invalid values)
    #[error("config error: {0}")]
    Config(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Errors that can occur while fetching a page or transcript.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    Status { url: String, status: u16 },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Per-call deadline exceeded
    #[error("timeout fetching: {url}")]
    Timeout { url: String },
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, metadata services)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors reported by the job store.
#[derive(Debug, Error)]
pub enum JobError {
    /// No job with this id
    #[error("job not found: {0}")]
    NotFound(uuid::Uuid),

    /// Status change that would move backwards or out of a terminal state
    #[error("invalid job transition {from:?} -> {to:?}")]
    InvalidTransition { from: JobStatus, to: JobStatus },
}

impl PipelineError {
    /// Build a fatal stage error.
    pub fn stage(stage: &'static str, reason: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            reason: reason.into(),
        }
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Result type alias for fetch operations.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

/// Result type alias for job store operations.
pub type JobResult<T> = std::result::Result<T, JobError>;
