//! Error taxonomy shared by adapters, the factory and bindings

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while constructing or running a data source adapter
///
/// Adapters convert every transport-level failure into one of these before
/// it leaves the adapter; raw client errors never cross that boundary.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DataSourceError {
    /// A required field is missing or malformed (raised before any I/O)
    #[error("{0}")]
    ConfigValidation(String),

    /// Network failure, non-2xx status, backend-reported error or bad payload
    #[error("{message}")]
    Fetch {
        message: String,
        code: Option<String>,
    },

    /// The user-supplied transform failed
    #[error("Failed to transform data: {0}")]
    Transform(String),

    /// The config names a type no adapter exists for
    #[error("Unsupported data source type: {0}")]
    UnsupportedSourceType(String),

    #[error("{0}")]
    Timeout(String),

    #[error("Request was cancelled")]
    Cancelled,

    #[error("{0}")]
    NotConnected(String),
}

impl DataSourceError {
    /// Fetch error without a specific code
    pub fn fetch(message: impl Into<String>) -> Self {
        DataSourceError::Fetch {
            message: message.into(),
            code: None,
        }
    }

    pub fn fetch_with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        DataSourceError::Fetch {
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        DataSourceError::ConfigValidation(message.into())
    }

    /// Human-readable message
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &str {
        match self {
            DataSourceError::ConfigValidation(_) => "CONFIG_ERROR",
            DataSourceError::Fetch { code, .. } => code.as_deref().unwrap_or("FETCH_ERROR"),
            DataSourceError::Transform(_) => "TRANSFORM_ERROR",
            DataSourceError::UnsupportedSourceType(_) => "UNSUPPORTED_SOURCE",
            DataSourceError::Timeout(_) => "TIMEOUT",
            DataSourceError::Cancelled => "CANCELLED",
            DataSourceError::NotConnected(_) => "NOT_CONNECTED",
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataSourceError::Fetch { .. }
                | DataSourceError::Timeout(_)
                | DataSourceError::NotConnected(_)
        )
    }
}

/// Normalized `{message, code}` error shape handed to renderers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl From<&DataSourceError> for ApiError {
    fn from(error: &DataSourceError) -> Self {
        ApiError {
            message: error.message(),
            code: Some(error.code().to_string()),
        }
    }
}

impl From<DataSourceError> for ApiError {
    fn from(error: DataSourceError) -> Self {
        ApiError::from(&error)
    }
}
