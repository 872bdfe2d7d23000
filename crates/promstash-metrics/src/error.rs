//! Engine error types

use promstash_store::StorageError;
use thiserror::Error;

/// Result type alias for engine operations
pub type MetricsResult<T> = Result<T, MetricsError>;

/// Errors raised by updates, collection and wipe
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Unknown update command or metric type
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// Label values could not be encoded
    #[error("label encoding failed: {0}")]
    Encoding(String),

    /// The store failed; never retried by the engine
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Stored data is present but unreadable
    #[error("corrupt metric data: {0}")]
    Decode(String),

    /// Label value count differs from label name count
    #[error("metric {name} expects {expected} label values, got {actual}")]
    LabelArity {
        /// Metric name
        name: String,
        /// Number of label names
        expected: usize,
        /// Number of label values supplied
        actual: usize,
    },

    /// Series definition rejected before touching the store
    #[error("invalid series {name}: {reason}")]
    InvalidSeries {
        /// Metric name
        name: String,
        /// What is wrong
        reason: String,
    },

    /// Update operand rejected before touching the store
    #[error("invalid value for {name}: {reason}")]
    InvalidValue {
        /// Metric name
        name: String,
        /// What is wrong
        reason: String,
    },
}

impl MetricsError {
    /// Create an InvalidCommand error
    pub fn invalid_command<S: Into<String>>(msg: S) -> Self {
        MetricsError::InvalidCommand(msg.into())
    }

    /// Create an Encoding error
    pub fn encoding<S: Into<String>>(msg: S) -> Self {
        MetricsError::Encoding(msg.into())
    }

    /// Create a Decode error
    pub fn decode<S: Into<String>>(msg: S) -> Self {
        MetricsError::Decode(msg.into())
    }

    /// Create an InvalidSeries error
    pub fn invalid_series<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        MetricsError::InvalidSeries {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidValue error
    pub fn invalid_value<N: Into<String>, R: Into<String>>(name: N, reason: R) -> Self {
        MetricsError::InvalidValue {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// True for errors caused by the caller's input rather than the store
    pub fn is_input_error(&self) -> bool {
        !matches!(self, MetricsError::Storage(_) | MetricsError::Decode(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_arity_message() {
        let err = MetricsError::LabelArity {
            name: "jobs".to_string(),
            expected: 2,
            actual: 1,
        };
        assert_eq!(err.to_string(), "metric jobs expects 2 label values, got 1");
        assert!(err.is_input_error());
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: MetricsError = StorageError::connection("refused").into();
        assert_eq!(err.to_string(), "connection error: refused");
        assert!(!err.is_input_error());
    }
}
