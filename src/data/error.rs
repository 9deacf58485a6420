use thiserror::Error;

/// Errors raised by the query core.
///
/// Per-cell parse failures during load are not errors; they end up as
/// nulls and are counted in [`LoadReport`](super::loader::LoadReport).
#[derive(Debug, Error)]
pub enum ExploreError {
    #[error("Required column(s) missing from header: {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("Dataset contains no usable rows")]
    EmptyDataset,

    #[error("Invalid filter on '{column}': {reason}")]
    InvalidFilter { column: String, reason: String },

    #[error("Invalid column '{column}': {reason}")]
    InvalidColumn { column: String, reason: String },

    #[error("{what} must be a positive integer")]
    InvalidCount { what: &'static str },

    #[error("Unsupported file extension: .{0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExploreError {
    pub(crate) fn invalid_filter(column: &str, reason: impl Into<String>) -> Self {
        ExploreError::InvalidFilter {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_column(column: &str, reason: impl Into<String>) -> Self {
        ExploreError::InvalidColumn {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ExploreError>;
