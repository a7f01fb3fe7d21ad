use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// How the quote and spec content are sourced for a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationMode {
    Auto,
    Manual,
    Json,
    JsonToImage,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMode::Auto => "AUTO",
            GenerationMode::Manual => "MANUAL",
            GenerationMode::Json => "JSON",
            GenerationMode::JsonToImage => "JSON_TO_IMAGE",
        }
    }

    /// Modes whose spec comes from caller-supplied JSON instead of the text model.
    pub fn is_direct_json(&self) -> bool {
        matches!(self, GenerationMode::Json | GenerationMode::JsonToImage)
    }

    pub fn mandates_image(&self) -> bool {
        matches!(self, GenerationMode::JsonToImage)
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "AUTO" => Some(GenerationMode::Auto),
            "MANUAL" => Some(GenerationMode::Manual),
            "JSON" => Some(GenerationMode::Json),
            "JSON_TO_IMAGE" => Some(GenerationMode::JsonToImage),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-provided quote fields used by MANUAL mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteInputs {
    pub quote: String,
    pub author: String,
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct QuoteBlock {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Caption {
    #[serde(default)]
    pub quote: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TechnicalSpecs {
    #[serde(default)]
    pub aspect_ratio: String,
    #[serde(default)]
    pub resolution: String,
}

/// The structured record produced before any image is generated.
///
/// `image_prompt_payload` and `video_prompt_payload` hold serialized JSON
/// documents that are handed verbatim to downstream generators.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssetSpec {
    #[serde(default)]
    pub spec_id: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub quote: QuoteBlock,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(
        rename = "jsonImagePrompt",
        default,
        deserialize_with = "payload_field"
    )]
    pub image_prompt_payload: Option<String>,
    #[serde(
        rename = "jsonVideoPrompt",
        default,
        deserialize_with = "payload_field"
    )]
    pub video_prompt_payload: Option<String>,
    #[serde(default)]
    pub caption: Option<Caption>,
    #[serde(rename = "altText", default)]
    pub alt_text: Option<String>,
    #[serde(default)]
    pub technical_specs: TechnicalSpecs,
}

impl AssetSpec {
    pub fn quote_text(&self) -> &str {
        &self.quote.text
    }

    pub fn image_prompt(&self) -> &str {
        self.image_prompt_payload.as_deref().unwrap_or("")
    }

    pub fn video_prompt(&self) -> &str {
        self.video_prompt_payload.as_deref().unwrap_or("")
    }
}

/// Models sometimes return the prompt documents as nested objects instead of
/// strings; both shapes are accepted and objects are re-serialized.
fn payload_field<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
