use crate::{
    bedrock::invoke_json,
    error::{ServiceError, ServiceResult},
};
use aws_sdk_bedrockruntime::Client;
use serde_json::{json, Value};

pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";
const MAX_TOKENS: u32 = 4096;
const TEMPERATURE: f32 = 0.9;

#[derive(Clone)]
pub struct TextClient {
    client: Client,
    model_id: String,
}

impl TextClient {
    pub fn new(client: Client, model_id: String) -> Self {
        Self { client, model_id }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    /// Plans a spec. The schema travels inside the system prompt since the
    /// messages API has no structured-output switch.
    pub async fn generate(
        &self,
        system_instructions: &str,
        user_prompt: &str,
        schema: &Value,
    ) -> ServiceResult<String> {
        let payload = build_request_payload(system_instructions, user_prompt, schema);
        let response = invoke_json(&self.client, &self.model_id, &payload).await?;
        let text = anthropic_text(&response)?;
        Ok(strip_code_fence(&text).to_string())
    }
}

pub fn build_request_payload(system_instructions: &str, user_prompt: &str, schema: &Value) -> Value {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_default();
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE,
        "system": format!(
            "{}\n\nRespond with a single JSON object that follows this schema:\n{}",
            system_instructions, schema_text
        ),
        "messages": [
            {
                "role": "user",
                "content": [{ "type": "text", "text": user_prompt }]
            }
        ]
    })
}

/// Joins every text block of an Anthropic messages response.
pub(crate) fn anthropic_text(response: &Value) -> ServiceResult<String> {
    let blocks = response["content"]
        .as_array()
        .ok_or_else(|| ServiceError::ResponseError("response has no content blocks".into()))?;

    let text: String = blocks
        .iter()
        .filter(|block| block["type"].as_str() == Some("text"))
        .filter_map(|block| block["text"].as_str())
        .collect();

    if response["stop_reason"].as_str() == Some("max_tokens") {
        log::warn!("Text model stopped at the token limit; output may be truncated");
    }
    Ok(text)
}

/// Models like to wrap JSON in a markdown fence even when told not to.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
