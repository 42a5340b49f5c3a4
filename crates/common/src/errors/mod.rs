//! Error types for PaperDesk crates
//!
//! Provides a single error enum shared by the store, the simulators and the
//! backend facade:
//! - Distinct error types for different failure modes
//! - Error codes for client handling
//! - Client/server classification for logging

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidMode,

    // Resource errors (4xxx)
    ChatNotFound,
    PaperNotFound,

    // Conflict errors (5xxx)
    Conflict,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidMode => 1002,

            // Resources (4xxx)
            ErrorCode::ChatNotFound => 4001,
            ErrorCode::PaperNotFound => 4002,

            // Conflicts (5xxx)
            ErrorCode::Conflict => 5001,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Unknown chat mode: {value}")]
    InvalidMode { value: String },

    // Resource errors
    #[error("Chat not found: {id}")]
    ChatNotFound { id: String },

    #[error("Paper not found: {id}")]
    PaperNotFound { id: String },

    // Conflict errors
    #[error("Duplicate resource: {message}")]
    Duplicate { message: String },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidMode { .. } => ErrorCode::InvalidMode,
            AppError::ChatNotFound { .. } => ErrorCode::ChatNotFound,
            AppError::PaperNotFound { .. } => ErrorCode::PaperNotFound,
            AppError::Duplicate { .. } => ErrorCode::Conflict,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Errors caused by the caller's input
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::InvalidMode { .. }
                | AppError::ChatNotFound { .. }
                | AppError::PaperNotFound { .. }
                | AppError::Duplicate { .. }
        )
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        !self.is_client_error()
    }

    /// Log the error at a level matching its severity
    pub fn log(&self) {
        let code = self.code();
        if self.is_server_error() {
            tracing::error!(error = %self, code = ?code, "Backend error");
        } else {
            tracing::warn!(error = %self, code = ?code, "Client error");
        }
    }
}

/// Structured error payload handed to the UI layer
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl From<&AppError> for ErrorDetails {
    fn from(err: &AppError) -> Self {
        let field = match err {
            AppError::Validation { field, .. } => field.clone(),
            _ => None,
        };
        Self {
            code: err.code(),
            message: err.to_string(),
            field,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field = errors.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: errors.to_string(),
            field,
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::ChatNotFound { id: "chat-9".into() };
        assert_eq!(err.code(), ErrorCode::ChatNotFound);
        assert_eq!(err.code().as_code(), 4001);
        assert!(err.is_client_error());
    }

    #[test]
    fn test_validation_error_details() {
        let err = AppError::Validation {
            message: "name too short".into(),
            field: Some("name".into()),
        };
        let details = ErrorDetails::from(&err);
        assert_eq!(details.code, ErrorCode::ValidationError);
        assert_eq!(details.field.as_deref(), Some("name"));
        assert!(!err.is_server_error());
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "lock poisoned".into(),
        };
        assert!(err.is_server_error());
        assert_eq!(err.code().as_code(), 9001);
    }

    #[test]
    fn test_error_details_serialization() {
        let err = AppError::InvalidMode { value: "poet".into() };
        let json = serde_json::to_value(ErrorDetails::from(&err)).unwrap();
        assert_eq!(json["code"], "INVALID_MODE");
        assert!(json.get("field").is_none());
    }
}
