use crate::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Cursor;

/// Structured text generation: returns the raw JSON text emitted by the model.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        system_instructions: &str,
        user_prompt: &str,
        schema: &Value,
    ) -> ServiceResult<String>;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Render `prompt_payload` at the requested aspect ratio tag.
    async fn generate(&self, prompt_payload: &str, aspect_ratio: &str) -> ServiceResult<Vec<u8>>;

    /// Produce a new image from `image` following `instruction`.
    async fn edit(&self, image: &[u8], instruction: &str) -> ServiceResult<Vec<u8>>;
}

#[async_trait]
pub trait ImageTranscriber: Send + Sync {
    async fn transcribe(&self, image: &[u8], instruction: &str) -> ServiceResult<String>;
}

pub trait DimensionDecoder: Send + Sync {
    fn dimensions(&self, image: &[u8]) -> ServiceResult<(u32, u32)>;
}

/// Reads pixel dimensions from the encoded image header.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageHeaderDecoder;

impl DimensionDecoder for ImageHeaderDecoder {
    fn dimensions(&self, image: &[u8]) -> ServiceResult<(u32, u32)> {
        image::ImageReader::new(Cursor::new(image))
            .with_guessed_format()
            .map_err(|e| ServiceError::DecodeError(e.to_string()))?
            .into_dimensions()
            .map_err(|e| ServiceError::DecodeError(e.to_string()))
    }
}
