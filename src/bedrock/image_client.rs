use crate::{
    bedrock::invoke_json,
    error::{ServiceError, ServiceResult},
    models::AspectRatio,
    service::{DimensionDecoder, ImageHeaderDecoder},
};
use aws_sdk_bedrockruntime::Client;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};

/// Titan rejects prompts longer than this many characters.
pub const TITAN_MAX_PROMPT_CHARS: usize = 512;
const CFG_SCALE: f32 = 8.0;
const EDIT_SIMILARITY: f32 = 0.9;

#[derive(Debug, Deserialize)]
struct TitanImageResponse {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    model_id: String,
}

impl ImageClient {
    pub fn new(client: Client, model_id: String) -> Self {
        Self { client, model_id }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub async fn generate(&self, prompt_payload: &str, aspect_ratio: &str) -> ServiceResult<Vec<u8>> {
        let (width, height) = titan_dimensions(aspect_ratio);
        log::info!(
            "Generating {}x{} image with model: {}",
            width,
            height,
            self.model_id
        );
        let payload = text_image_payload(prompt_payload, width, height);
        let response = invoke_json(&self.client, &self.model_id, &payload).await?;
        first_image(response)
    }

    /// Regenerates `image` steered by `instruction`, keeping its size.
    pub async fn edit(&self, image: &[u8], instruction: &str) -> ServiceResult<Vec<u8>> {
        let (width, height) = ImageHeaderDecoder.dimensions(image)?;
        log::info!("Editing {}x{} image with model: {}", width, height, self.model_id);
        let payload = variation_payload(image, instruction, width, height);
        let response = invoke_json(&self.client, &self.model_id, &payload).await?;
        first_image(response)
    }
}

/// Closest size Titan accepts for each supported ratio.
pub fn titan_dimensions(aspect_ratio: &str) -> (u32, u32) {
    match AspectRatio::from_tag(aspect_ratio) {
        Some(AspectRatio::Portrait9x16) => (768, 1408),
        Some(AspectRatio::Portrait3x4) => (896, 1152),
        Some(AspectRatio::Landscape16x9) => (1408, 768),
        Some(AspectRatio::Square1x1) | None => (1024, 1024),
    }
}

pub fn text_image_payload(prompt: &str, width: u32, height: u32) -> Value {
    json!({
        "taskType": "TEXT_IMAGE",
        "textToImageParams": {
            "text": clip_prompt(prompt)
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "quality": "premium",
            "width": width,
            "height": height,
            "cfgScale": CFG_SCALE
        }
    })
}

pub fn variation_payload(image: &[u8], instruction: &str, width: u32, height: u32) -> Value {
    json!({
        "taskType": "IMAGE_VARIATION",
        "imageVariationParams": {
            "text": clip_prompt(instruction),
            "images": [STANDARD.encode(image)],
            "similarityStrength": EDIT_SIMILARITY
        },
        "imageGenerationConfig": {
            "numberOfImages": 1,
            "quality": "premium",
            "width": width,
            "height": height,
            "cfgScale": CFG_SCALE
        }
    })
}

pub fn clip_prompt(prompt: &str) -> &str {
    match prompt.char_indices().nth(TITAN_MAX_PROMPT_CHARS) {
        Some((cut, _)) => {
            log::warn!(
                "Prompt is {} chars; Titan accepts {}, clipping",
                prompt.chars().count(),
                TITAN_MAX_PROMPT_CHARS
            );
            &prompt[..cut]
        }
        None => prompt,
    }
}

fn first_image(response: Value) -> ServiceResult<Vec<u8>> {
    let titan_response: TitanImageResponse = serde_json::from_value(response)
        .map_err(|e| ServiceError::ResponseError(e.to_string()))?;

    if let Some(error) = titan_response.error.filter(|e| !e.is_empty()) {
        return Err(ServiceError::NoImage(error));
    }
    let encoded = titan_response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| ServiceError::NoImage("No images generated".into()))?;

    STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| ServiceError::DecodeError(format!("image is not valid base64: {}", e)))
}
