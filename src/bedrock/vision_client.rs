use crate::{
    bedrock::{invoke_json, text_client::{anthropic_text, ANTHROPIC_VERSION}},
    error::{ServiceError, ServiceResult},
};
use aws_sdk_bedrockruntime::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::ImageFormat;
use serde_json::{json, Value};

const MAX_TOKENS: u32 = 512;

/// Reads text back out of rendered images with a multimodal Claude model.
#[derive(Clone)]
pub struct VisionClient {
    client: Client,
    model_id: String,
}

impl VisionClient {
    pub fn new(client: Client, model_id: String) -> Self {
        Self { client, model_id }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn transcribe(&self, image: &[u8], instruction: &str) -> ServiceResult<String> {
        let payload = transcription_payload(image, instruction)?;
        let response = invoke_json(&self.client, &self.model_id, &payload).await?;
        Ok(anthropic_text(&response)?.trim().to_string())
    }
}

pub fn media_type(image: &[u8]) -> ServiceResult<&'static str> {
    match image::guess_format(image) {
        Ok(ImageFormat::Png) => Ok("image/png"),
        Ok(ImageFormat::Jpeg) => Ok("image/jpeg"),
        Ok(ImageFormat::WebP) => Ok("image/webp"),
        Ok(ImageFormat::Gif) => Ok("image/gif"),
        Ok(other) => Err(ServiceError::DecodeError(format!(
            "{:?} images cannot be sent for transcription",
            other
        ))),
        Err(e) => Err(ServiceError::DecodeError(e.to_string())),
    }
}

pub fn transcription_payload(image: &[u8], instruction: &str) -> ServiceResult<Value> {
    Ok(json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": MAX_TOKENS,
        "temperature": 0.0,
        "messages": [
            {
                "role": "user",
                "content": [
                    {
                        "type": "image",
                        "source": {
                            "type": "base64",
                            "media_type": media_type(image)?,
                            "data": STANDARD.encode(image)
                        }
                    },
                    { "type": "text", "text": instruction }
                ]
            }
        ]
    }))
}
