// Promstash - Shared-store metrics engine
// Copyright (C) 2026 Promstash Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.

//! Store error types and utilities

use thiserror::Error;

/// Result type alias for store operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StorageError {
    /// The backend could not be reached
    #[error("connection error: {0}")]
    Connection(String),

    /// The backend rejected a command or script
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored value has the wrong type for the requested command
    #[error("wrong value type at key {key}: {reason}")]
    WrongType {
        /// Offending key
        key: String,
        /// What was expected
        reason: String,
    },

    /// Invalid request (empty key, empty update)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Operation timed out
    #[error("operation timed out: {0}")]
    Timeout(String),

    /// Transparent error delegation for wrapped error types
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StorageError {
    /// Create a Connection error with context
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        StorageError::Connection(msg.into())
    }

    /// Create a Backend error with context
    pub fn backend<S: Into<String>>(msg: S) -> Self {
        StorageError::Backend(msg.into())
    }

    /// Create a WrongType error for `key`
    pub fn wrong_type<K: Into<String>, R: Into<String>>(key: K, reason: R) -> Self {
        StorageError::WrongType {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidRequest error with context
    pub fn invalid_request<S: Into<String>>(msg: S) -> Self {
        StorageError::InvalidRequest(msg.into())
    }

    /// Create a Timeout error with context
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        StorageError::Timeout(msg.into())
    }

    /// Check if this is a WrongType error
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, StorageError::WrongType { .. })
    }

    /// Check if this is a transport-level failure (connection or timeout)
    pub fn is_transport(&self) -> bool {
        matches!(self, StorageError::Connection(_) | StorageError::Timeout(_))
    }
}

#[cfg(feature = "redis")]
impl From<redis::RedisError> for StorageError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_timeout() {
            StorageError::Timeout(err.to_string())
        } else if err.is_io_error() || err.is_connection_dropped() || err.is_connection_refusal() {
            StorageError::Connection(err.to_string())
        } else {
            StorageError::Backend(err.to_string())
        }
    }
}
