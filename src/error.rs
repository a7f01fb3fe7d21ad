use crate::repair::{RepairDiagnostic, UnrepairableJson};
use thiserror::Error;

/// Failures reported by the external generation collaborators.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Request error: {0}")]
    RequestError(String),
    #[error("Response error: {0}")]
    ResponseError(String),
    #[error("No image returned: {0}")]
    NoImage(String),
    #[error("Image decode error: {0}")]
    DecodeError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
    #[error("AWS error: {0}")]
    AwsError(String),
    #[error("AWS service error: {0}")]
    AwsServiceError(String),
}

impl ServiceError {
    /// True when the upstream signalled throttling (HTTP 429 or equivalent).
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited(_))
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid JSON provided. {0}")]
    InvalidInput(String),

    #[error("Rate limit exceeded during {stage}. Please wait a few seconds and try again.")]
    RateLimited { stage: &'static str },

    #[error("Could not repair JSON for field '{field}': {diagnostic}")]
    UnrepairableOutput {
        field: String,
        diagnostic: RepairDiagnostic,
    },

    #[error("Image generation requested but the image prompt payload is empty")]
    MissingImagePrompt,

    #[error("Failed to generate variation {variation} after {attempts} attempts")]
    ImageGenerationExhausted { variation: usize, attempts: u32 },

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl PipelineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, PipelineError::RateLimited { .. })
    }
}

impl From<UnrepairableJson> for PipelineError {
    fn from(err: UnrepairableJson) -> Self {
        PipelineError::UnrepairableOutput {
            field: err.field,
            diagnostic: err.diagnostic,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
