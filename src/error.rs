//! Error types for the agent cortex

use thiserror::Error;

/// Result type alias for cortex operations
pub type Result<T> = std::result::Result<T, CortexError>;

#[derive(Error, Debug)]
pub enum CortexError {

    // =============================
    // Routing & Classification
    // =============================

    #[error("Classification failed: {0}")]
    ClassificationFailure(String),

    #[error("No handler registered for domain: {0}")]
    DispatchNotFound(String),

    #[error("Handler error: {0}")]
    HandlerError(String),

    // =============================
    // Startup
    // =============================

    #[error("Registration conflict: {kind} '{name}' is already registered")]
    RegistrationConflict { kind: &'static str, name: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // =============================
    // Registries
    // =============================

    #[error("Capability not found: {0}")]
    CapabilityNotFound(String),

    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("Strategy not found: {0}")]
    StrategyNotFound(String),

    // =============================
    // Memory
    // =============================

    #[error("Memory backend unreachable: {0}")]
    MemoryIoFailure(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Failure raised by a capability, with the original cause preserved.
#[derive(Error, Debug)]
#[error("Capability '{capability}' failed: {source}")]
pub struct CapabilityError {
    pub capability: String,
    #[source]
    pub source: anyhow::Error,
}

impl CapabilityError {
    pub fn new(capability: impl Into<String>, source: anyhow::Error) -> Self {
        Self {
            capability: capability.into(),
            source,
        }
    }
}
