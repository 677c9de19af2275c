use thiserror::Error;

/// Convenience result type for dataset and query operations.
pub type InsightResult<T> = Result<T, InsightError>;

/// Error type returned by the store, the record parser, the query validator and the evaluator.
///
/// Each variant maps to one response code via [`InsightError::status_code`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    /// A dataset is already loaded under this identifier.
    #[error("dataset with id '{id}' already exists")]
    DuplicateId { id: String },

    /// No dataset is loaded under this identifier.
    #[error("dataset with id '{id}' does not exist")]
    NotFound { id: String },

    /// The identifier is blank or contains an underscore.
    #[error("invalid dataset id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    /// The archive is unreadable, has the wrong shape, or yields no valid rows.
    #[error("malformed dataset: {message}")]
    MalformedDataset { message: String },

    /// The query document failed validation.
    #[error("invalid query: {message}")]
    InvalidQuery { message: String },

    /// The query would return more rows than the configured ceiling.
    #[error("result too large: {rows} rows exceeds the limit of {limit}")]
    ResultTooLarge { rows: usize, limit: usize },
}

impl InsightError {
    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedDataset {
            message: message.into(),
        }
    }

    pub(crate) fn invalid_query(message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            message: message.into(),
        }
    }

    /// Response code reported at the facade boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound { .. } => 404,
            _ => 400,
        }
    }
}
