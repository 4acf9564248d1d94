//! Error types for the study assistant client.

use thiserror::Error;

use crate::models::ArtifactKind;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the study endpoints or driving a session.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Local I/O error (session snapshots, uploaded files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The account cannot pay for a metered operation
    #[error("Insufficient credits: {required} required, {current} available")]
    InsufficientCredits {
        required: i64,
        current: i64,
        description: Option<String>,
    },

    /// The backend failed to generate the artifact; no credits were consumed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Non-success response that carries no structured error
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// A generation for the same session and artifact is already running
    #[error("{kind} generation already in progress for session {session_id}")]
    AlreadyInFlight {
        session_id: String,
        kind: ArtifactKind,
    },

    /// The server reported a failed background job
    #[error("Background generation failed: {0}")]
    PollingFailed(String),

    /// No terminal state was observed before the polling deadline
    #[error("Gave up waiting for background generation; reload to check again")]
    PollingTimedOut,

    /// The operation was cancelled by the caller
    #[error("Operation cancelled")]
    Cancelled,

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// How a failure is presented to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Blocking dialog with the amounts from the server response
    CreditsModal {
        required: i64,
        current: i64,
        description: Option<String>,
    },
    /// Dismissible banner next to the feature that failed
    Inline(String),
    /// Blocking alert
    Alert(String),
}

impl Error {
    /// Get the user-facing surface for this error.
    pub fn notice(&self) -> Notice {
        match self {
            Error::InsufficientCredits {
                required,
                current,
                description,
            } => Notice::CreditsModal {
                required: *required,
                current: *current,
                description: description.clone(),
            },
            Error::GenerationFailed(msg) => {
                Notice::Inline(format!("{} Your credits were not charged.", msg))
            }
            Error::AlreadyInFlight { .. }
            | Error::PollingFailed(_)
            | Error::PollingTimedOut
            | Error::Validation(_) => Notice::Inline(self.to_string()),
            Error::Http(_) | Error::Api { .. } => {
                Notice::Inline("Something went wrong. Please try again.".to_string())
            }
            _ => Notice::Alert(self.to_string()),
        }
    }
}
