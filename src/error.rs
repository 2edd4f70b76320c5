//! Error types for the inbox.

use uuid::Uuid;

use crate::inbox::Status;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Seed data error: {0}")]
    Seed(#[from] SeedError),

    #[error("Generation error: {0}")]
    Generation(#[from] GenerationError),

    #[error("Compose error: {0}")]
    Compose(#[from] ComposeError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors loading the inbound correspondence set.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed seed JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Duplicate correspondence id: {id}")]
    DuplicateId { id: String },

    #[error("Duplicate attachment id {attachment_id} in correspondence {id}")]
    DuplicateAttachmentId { id: String, attachment_id: String },
}

/// Failures from the text-generation collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Backend {backend} request failed: {reason}")]
    RequestFailed { backend: String, reason: String },

    #[error("Backend {backend} rate limited, try again later")]
    RateLimited { backend: String },

    #[error("Backend {backend} requires payment, add credits to the workspace")]
    PaymentRequired { backend: String },

    #[error("Invalid response from {backend}: {reason}")]
    InvalidResponse { backend: String, reason: String },

    #[error("Backend {backend} returned an empty response")]
    EmptyResponse { backend: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Compose session errors.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    #[error("Failed to generate response: {0}")]
    GenerationFailed(#[from] GenerationError),

    #[error("Draft body is empty")]
    EmptyDraft,

    #[error("Compose session {session_id} is closed")]
    SessionClosed { session_id: Uuid },

    #[error("Correspondence {id} not found")]
    UnknownItem { id: String },

    #[error("No compose session is open")]
    NoActiveSession,
}

/// Status state machine errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Correspondence {id} is {from}, cannot transition to {to}")]
    InvalidTransition { id: String, from: Status, to: Status },
}

/// Result type alias for the inbox.
pub type Result<T> = std::result::Result<T, Error>;
