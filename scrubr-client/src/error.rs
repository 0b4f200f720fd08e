//! Error types for scrubr-client
//!
//! Every remote-call site converts failures into a [`ClientError`]; the
//! wizard turns them into user-facing messages via [`ClientError::user_message`].

use thiserror::Error;

/// Local validation failures. These never reach the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Output directory is required")]
    EmptyOutputDir,

    #[error("Output directory contains an invalid character: {0:?}")]
    InvalidOutputDirChar(char),

    #[error("Select a field mapping before starting")]
    MissingMapping,

    #[error("Select at least one file")]
    EmptySelection,

    #[error("Action not available on step {actual:?} (expected {expected:?})")]
    WrongStep {
        expected: scrubr_common::events::WizardStep,
        actual: scrubr_common::events::WizardStep,
    },

    #[error("Entry is not part of the current listing: {0}")]
    NotInListing(String),
}

/// Client error type
#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally before any remote call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No response (connection refused, timeout, reset)
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Durable key-value store failure
    #[error("Store error: {0}")]
    Store(String),

    #[error("Common error: {0}")]
    Common(#[from] scrubr_common::Error),
}

impl ClientError {
    /// Message suitable for showing to the user
    ///
    /// Validation and API errors carry specific text; transport-level
    /// failures collapse into a generic message.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Validation(e) => e.to_string(),
            ClientError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ClientError::Api { status, .. } => {
                format!("The server rejected the request (status {}).", status)
            }
            ClientError::Network(_) => {
                "Could not reach the sanitization service. Check that it is running and try again."
                    .to_string()
            }
            ClientError::Parse(_) => {
                "The sanitization service sent an unexpected response.".to_string()
            }
            ClientError::Store(_) | ClientError::Common(_) => {
                "An unexpected error occurred.".to_string()
            }
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ClientError::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            ClientError::Api {
                status: status.as_u16(),
                message: String::new(),
            }
        } else {
            ClientError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Parse(err.to_string())
    }
}

/// Result type for client operations
pub type ClientResult<T> = Result<T, ClientError>;
