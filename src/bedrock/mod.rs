pub mod image_client;
pub mod text_client;
pub mod vision_client;

use crate::{
    config::BedrockConfig,
    error::{ServiceError, ServiceResult},
    service::{ImageGenerator, ImageTranscriber, TextGenerator},
};
use async_trait::async_trait;
use aws_sdk_bedrockruntime::{
    config::http::HttpResponse,
    error::{ProvideErrorMetadata, SdkError},
    operation::invoke_model::InvokeModelError,
    primitives::Blob,
    Client,
};
use serde_json::Value;

pub use image_client::ImageClient;
pub use text_client::TextClient;
pub use vision_client::VisionClient;

/// Bedrock-backed implementation of every generation collaborator the
/// pipeline needs: Anthropic messages for planning and transcription, Titan
/// for image generation and editing.
#[derive(Clone)]
pub struct BedrockService {
    text_client: TextClient,
    image_client: ImageClient,
    vision_client: VisionClient,
}

impl BedrockService {
    pub async fn new(bedrock_config: BedrockConfig) -> ServiceResult<Self> {
        let aws_config = if let (Some(access_key), Some(secret_key)) =
            (&bedrock_config.access_key, &bedrock_config.secret_key)
        {
            aws_config::from_env()
                .credentials_provider(aws_sdk_bedrockruntime::config::Credentials::new(
                    access_key,
                    secret_key,
                    None,
                    None,
                    "mantra-gen",
                ))
                .region(aws_sdk_bedrockruntime::config::Region::new(
                    bedrock_config
                        .region
                        .clone()
                        .unwrap_or_else(|| "us-east-1".to_string()),
                ))
                .load()
                .await
        } else {
            aws_config::load_from_env().await
        };

        let client = Client::new(&aws_config);
        log::info!(
            "🤖 Bedrock ready: text {}, image {}, vision {}",
            bedrock_config.text_model,
            bedrock_config.image_model,
            bedrock_config.vision_model
        );

        Ok(Self {
            text_client: TextClient::new(client.clone(), bedrock_config.text_model),
            image_client: ImageClient::new(client.clone(), bedrock_config.image_model),
            vision_client: VisionClient::new(client, bedrock_config.vision_model),
        })
    }

    pub fn text(&self) -> &TextClient {
        &self.text_client
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn vision(&self) -> &VisionClient {
        &self.vision_client
    }
}

#[async_trait]
impl TextGenerator for BedrockService {
    async fn generate(
        &self,
        system_instructions: &str,
        user_prompt: &str,
        schema: &Value,
    ) -> ServiceResult<String> {
        self.text_client
            .generate(system_instructions, user_prompt, schema)
            .await
    }
}

#[async_trait]
impl ImageGenerator for BedrockService {
    async fn generate(&self, prompt_payload: &str, aspect_ratio: &str) -> ServiceResult<Vec<u8>> {
        self.image_client.generate(prompt_payload, aspect_ratio).await
    }

    async fn edit(&self, image: &[u8], instruction: &str) -> ServiceResult<Vec<u8>> {
        self.image_client.edit(image, instruction).await
    }
}

#[async_trait]
impl ImageTranscriber for BedrockService {
    async fn transcribe(&self, image: &[u8], instruction: &str) -> ServiceResult<String> {
        self.vision_client.transcribe(image, instruction).await
    }
}

/// Sends one JSON body to `InvokeModel` and parses the JSON reply.
pub(crate) async fn invoke_json(client: &Client, model_id: &str, payload: &Value) -> ServiceResult<Value> {
    let request_json = serde_json::to_string(payload)
        .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

    log::info!("Invoking model: {}", model_id);
    log::debug!("Request payload is {} bytes", request_json.len());

    let response = client
        .invoke_model()
        .model_id(model_id)
        .content_type("application/json")
        .accept("application/json")
        .body(Blob::new(request_json.into_bytes()))
        .send()
        .await
        .map_err(|e| map_invoke_error(model_id, e))?;

    let response_bytes = response.body.into_inner();
    serde_json::from_slice(&response_bytes)
        .map_err(|e| ServiceError::ResponseError(format!("{} returned invalid JSON: {}", model_id, e)))
}

/// Throttling becomes [`ServiceError::RateLimited`] so the pipeline can cool down.
pub(crate) fn map_invoke_error(
    model_id: &str,
    e: SdkError<InvokeModelError, HttpResponse>,
) -> ServiceError {
    log::error!("AWS SDK error from {}: {:?}", model_id, e);

    if e.raw_response().map(|raw| raw.status().as_u16()) == Some(429) {
        return ServiceError::RateLimited(format!("{} returned HTTP 429", model_id));
    }

    match e.as_service_error() {
        Some(service_error) if service_error.is_throttling_exception() => {
            ServiceError::RateLimited(format!(
                "{}: {}",
                model_id,
                service_error.message().unwrap_or("throttled")
            ))
        }
        Some(service_error) => {
            log::error!("Service error code: {:?}", service_error.code());
            ServiceError::AwsServiceError(format!(
                "Bedrock service error: {} - {}",
                service_error.code().unwrap_or("unknown"),
                service_error.message().unwrap_or("no message")
            ))
        }
        None => ServiceError::AwsError(format!("AWS SDK error: {}", e)),
    }
}
