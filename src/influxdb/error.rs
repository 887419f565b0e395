//! # InfluxDB Client Errors

use serde::Deserialize;
use thiserror::Error;

/// Error returned by an InfluxDB session
#[derive(Debug, Error)]
pub enum InfluxError {
    /// Non-success HTTP status with the server's error body
    #[error("InfluxDB returned HTTP {status}: {message}")]
    Http {
        status: u16,
        code: Option<String>,
        message: String,
    },
    /// Connection, TLS or timeout failure
    #[error("InfluxDB transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Response body was missing fields the operator relies on
    #[error("invalid InfluxDB response: {0}")]
    InvalidResponse(String),
    /// Request could not be built from the supplied address or credential
    #[error("invalid InfluxDB request: {0}")]
    InvalidRequest(String),
}

impl InfluxError {
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::Http {
            status: 404,
            code: Some("not found".to_string()),
            message: message.into(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            InfluxError::Http { status, .. } => Some(*status),
            InfluxError::Transport(e) => e.status().map(|s| s.as_u16()),
            InfluxError::InvalidResponse(_) | InfluxError::InvalidRequest(_) => None,
        }
    }

    /// InfluxDB reports "already exists" as 422 Unprocessable Entity
    pub fn is_conflict(&self) -> bool {
        self.status() == Some(422)
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Whether retrying the same request later may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            InfluxError::Http { status, .. } => *status == 429 || *status >= 500,
            InfluxError::Transport(_) => true,
            InfluxError::InvalidResponse(_) | InfluxError::InvalidRequest(_) => false,
        }
    }
}

/// Error body returned by the InfluxDB v2 API
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
