use thiserror::Error;

/// Application-wide error types.
///
/// Only caller errors and collaborator failures end up here. Data-quality
/// problems (empty or malformed emails, duplicates) and upstream chunk
/// failures are reported inside the [`SyncSummary`](crate::SyncSummary)
/// instead and never abort a sync.
///
/// # Error Conversion
///
/// - `sqlx::Error` → `AppError::DatabaseError`
/// - `serde_json::Error` → `AppError::SerializationError`
///
/// # Examples
///
/// ```no_run
/// use leadsync_core::error::AppError;
///
/// fn example() -> Result<(), AppError> {
///     Err(AppError::InvalidBatchSize(0))
/// }
/// ```
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed.
    ///
    /// Wraps all errors from SQLx, including connection failures, query errors
    /// and constraint violations. A failed import-log write is fatal to the
    /// sync call that produced it.
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    /// HTTP client could not be built or a request could not be sent.
    #[error("API Client error: {0}")]
    ClientError(String),

    /// The CRM answered a single-record request with a non-success status.
    #[error("Upstream rejected the request (HTTP {status}): {body}")]
    UpstreamRejected { status: u16, body: String },

    /// JSON serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Chunk size of zero was requested.
    #[error("Invalid batch size: {0} (must be at least 1)")]
    InvalidBatchSize(usize),

    /// Dispatch concurrency of zero was requested.
    #[error("Invalid concurrency: {0} (must be at least 1)")]
    InvalidConcurrency(usize),

    /// Configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Import log not found in the database.
    #[error("Import log not found: {0}")]
    LogNotFound(String),

    /// Network or connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timeout.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),
}

impl AppError {
    /// Returns a user-friendly error message suitable for CLI output.
    pub fn user_message(&self) -> String {
        match self {
            AppError::DatabaseError(e) => {
                if e.to_string().contains("connection") {
                    "Cannot connect to database. Is PostgreSQL running?\n   Check DATABASE_URL."
                        .to_string()
                } else {
                    format!("Database error: {}", e)
                }
            }
            AppError::UpstreamRejected { status, body } => match status {
                401 | 403 => "HubSpot rejected the access token.\n   Check HUBSPOT_ACCESS_TOKEN."
                    .to_string(),
                429 => "HubSpot rate limit reached.\n   Wait a moment and try again.".to_string(),
                _ => format!("HubSpot error (HTTP {}): {}", status, body),
            },
            AppError::InvalidBatchSize(_) | AppError::InvalidConcurrency(_) => {
                format!("{}\n   Pass a positive value.", self)
            }
            AppError::NetworkError(msg) => {
                format!("Network error: {}\n   Check your internet connection.", msg)
            }
            AppError::Timeout(secs) => {
                format!(
                    "Request timed out after {} seconds.\n   HubSpot may be slow. Try again later.",
                    secs
                )
            }
            _ => self.to_string(),
        }
    }
}
